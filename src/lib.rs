//! Versioned Resource Compiler
//!
//! Compiles declarative resource definitions (localized strings, per-version
//! configuration values) into generated Rust modules with compile-time key
//! constants and a versioned lookup table.
//!
//! ## Features
//!
//! - **Multiple Sources**: inline maps, line-oriented lists, keyed tables and
//!   directories of keyed tables
//! - **Version Reconciliation**: every version must define exactly the keys of
//!   the default version
//! - **Deterministic Output**: identical inputs produce byte-identical files
//! - **Fingerprinted Files**: SHA256 fingerprints reveal hand edits
//!
//! ## Pipeline
//!
//! ```text
//! manifest ──► DefinitionLoader ──► Reconciler ──► ModelBuilder ──► Emitter ──► .rs
//!                   │                   │
//!              TabularReader       KeyNormalizer
//! ```

pub mod checksum;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod definition;
pub mod document;
pub mod error;
pub mod reconcile;
pub mod tabular;

pub use checksum::Fingerprint;
pub use codegen::{
    EmissionModel, Emitter, KeyNormalizer, ModelBuilder, NamingConfig, RustEmitter,
};
pub use compiler::{CheckReport, Compiler, Drift, DriftKind, RunReport, UnitFailure};
pub use config::{Configuration, Manifest};
pub use definition::{
    DefinitionLoader, GeneratorMode, RawVersionSource, ResourceDefinition, SourceKind,
};
pub use error::{ErrorKind, ResourceError, Result};
pub use reconcile::{CanonicalKeySet, NormalizedVersionTable, Reconciler};
pub use tabular::{ReadMode, TabularData, TabularReader};
