//! Code Generation
//!
//! Turns reconciled definitions into an [`EmissionModel`] and renders it.
//!
//! Architecture:
//! - EmissionModel: neutral description of one generated module (constants,
//!   version table, per-table key modules). Immutable once built.
//! - ModelBuilder: assembles the model and guards identifier uniqueness per scope
//! - Emitters: language-specific renderers that consume only the model
//!
//! The key constraint: emitters never see definitions or raw sources.

pub mod config;
pub mod names;
pub mod rust;

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::definition::{RawVersionSource, ResourceDefinition};
use crate::error::{ResourceError, Result};
use crate::reconcile::{CanonicalKeySet, NormalizedVersionTable};

pub use self::config::{ListMode, NamingConfig};
pub use self::names::{is_identifier, IdentifierRegistry, KeyNormalizer};
pub use self::rust::RustEmitter;

// =============================================================================
// Emission Model
// =============================================================================

/// Value of a generated constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "literal", rename_all = "lowercase")]
pub enum ConstantValue {
    /// Position of a key in the version table
    Index(usize),
    /// String literal
    Str(String),
}

/// One generated constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constant {
    pub name: String,
    pub value: ConstantValue,
}

impl Constant {
    fn index(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            value: ConstantValue::Index(index),
        }
    }

    fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ConstantValue::Str(value.into()),
        }
    }
}

/// Key constants of one table of a grouped definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyModule {
    /// Generated type name (PascalCase of the table name)
    pub name: String,
    /// Raw table name
    pub table: String,
    pub constants: Vec<Constant>,
}

/// Versioned lookup data of a values definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionLookup {
    pub table: NormalizedVersionTable,
    pub default_version: String,
    pub allowed_versions: Vec<String>,
}

/// Everything an emitter needs to render one generated module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmissionModel {
    pub class_name: String,
    pub namespace_path: Vec<String>,
    /// Output sub-directories below the output root
    pub output_dir: Vec<String>,
    /// Definition file the model was compiled from
    pub source: PathBuf,
    pub constants: Vec<Constant>,
    pub lookup: Option<VersionLookup>,
    pub key_modules: Vec<KeyModule>,
}

impl EmissionModel {
    /// Value stored for a key constant in `version`, as the generated
    /// `get_value` accessor resolves it
    pub fn get_value(&self, identifier: &str, version: &str) -> Option<&str> {
        self.lookup.as_ref()?.table.get(version, identifier)
    }

    pub fn has_value(&self, identifier: &str, version: &str) -> bool {
        self.get_value(identifier, version).is_some()
    }

    pub fn default_version(&self) -> Option<&str> {
        self.lookup.as_ref().map(|l| l.default_version.as_str())
    }

    pub fn is_version_allowed(&self, version: &str) -> bool {
        self.lookup
            .as_ref()
            .map(|l| l.allowed_versions.iter().any(|v| v == version))
            .unwrap_or(false)
    }

    /// Find a top-level constant by name
    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }
}

// =============================================================================
// Model Builder
// =============================================================================

/// Assembles [`EmissionModel`]s from loaded and reconciled definitions
pub struct ModelBuilder<'a> {
    normalizer: &'a KeyNormalizer,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(normalizer: &'a KeyNormalizer) -> Self {
        Self { normalizer }
    }

    /// Model of a values definition
    pub fn build(
        &self,
        definition: &ResourceDefinition,
        keys: &CanonicalKeySet,
        table: NormalizedVersionTable,
        default_version: &str,
    ) -> Result<EmissionModel> {
        let mut scope = IdentifierRegistry::new();
        let mut type_names = class_scope(definition)?;
        let mut constants = Vec::new();
        let mut key_modules = Vec::new();

        match keys {
            CanonicalKeySet::Flat(raw) => {
                for (index, (identifier, key)) in table.identifiers().iter().zip(raw).enumerate() {
                    claim(definition, &mut scope, identifier, key)?;
                    constants.push(Constant::index(identifier.as_str(), index));
                }
            }
            CanonicalKeySet::Grouped(tables) => {
                let mut index = 0;
                for canonical in tables {
                    let name = self.normalizer.type_name(&canonical.name);
                    claim(definition, &mut type_names, &name, &canonical.name)?;

                    let mut fields = IdentifierRegistry::new();
                    let mut module_constants = Vec::with_capacity(canonical.fields.len());
                    for field in &canonical.fields {
                        let identifier = self.normalizer.normalize(field);
                        claim(definition, &mut fields, &identifier, field)?;
                        module_constants.push(Constant::index(identifier, index));
                        index += 1;
                    }
                    key_modules.push(KeyModule {
                        name,
                        table: canonical.name.clone(),
                        constants: module_constants,
                    });
                }
            }
        }

        let prefix = definition.version_key_prefix.as_deref();
        let normalizer =
            KeyNormalizer::new(self.normalizer.config().with_version_key_prefix(prefix));
        let allowed_versions: Vec<String> = table.version_names().map(str::to_string).collect();
        for version in &allowed_versions {
            let identifier = normalizer.version_constant(version);
            claim(definition, &mut scope, &identifier, version)?;
            constants.push(Constant::string(identifier, version.as_str()));
        }

        if !allowed_versions.iter().any(|v| v == default_version) {
            return Err(ResourceError::InvalidVersion {
                version: default_version.to_string(),
                reason: "default version is not defined".to_string(),
            });
        }

        debug!(
            class = %definition.class_name,
            constants = constants.len(),
            key_modules = key_modules.len(),
            "built values model"
        );

        Ok(EmissionModel {
            class_name: definition.class_name.clone(),
            namespace_path: definition.namespace_path.clone(),
            output_dir: definition.add_namespace.clone(),
            source: definition.source.clone(),
            constants,
            lookup: Some(VersionLookup {
                table,
                default_version: default_version.to_string(),
                allowed_versions,
            }),
            key_modules,
        })
    }

    /// Model of a constants definition: one string constant per entry
    pub fn build_constants(
        &self,
        definition: &ResourceDefinition,
        source: &RawVersionSource,
    ) -> Result<EmissionModel> {
        class_scope(definition)?;
        let entries: Vec<(&str, &str)> = match source {
            RawVersionSource::Literal(records) | RawVersionSource::Keyed(records) => records
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            RawVersionSource::List(list) => {
                list.iter().map(|v| (v.as_str(), v.as_str())).collect()
            }
            RawVersionSource::Grouped(_) => {
                return Err(ResourceError::configuration(
                    &definition.source,
                    "grouped data cannot be compiled to constants",
                ))
            }
        };

        let mut scope = IdentifierRegistry::new();
        let mut constants = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let identifier = self.normalizer.normalize(key);
            claim(definition, &mut scope, &identifier, key)?;
            constants.push(Constant::string(identifier, value));
        }

        debug!(
            class = %definition.class_name,
            constants = constants.len(),
            "built constants model"
        );

        Ok(EmissionModel {
            class_name: definition.class_name.clone(),
            namespace_path: definition.namespace_path.clone(),
            output_dir: definition.add_namespace.clone(),
            source: definition.source.clone(),
            constants,
            lookup: None,
            key_modules: Vec::new(),
        })
    }
}

/// Claim `identifier` for `raw` in one scope, rejecting names Rust cannot spell
fn claim(
    definition: &ResourceDefinition,
    scope: &mut IdentifierRegistry,
    identifier: &str,
    raw: &str,
) -> Result<()> {
    if !is_identifier(identifier) {
        return Err(ResourceError::configuration(
            &definition.source,
            format!("'{}' does not form a valid identifier ({})", raw, identifier),
        ));
    }
    scope.claim(identifier, raw)
}

/// Type-name scope of a generated module, seeded with its class name
fn class_scope(definition: &ResourceDefinition) -> Result<IdentifierRegistry> {
    let mut scope = IdentifierRegistry::new();
    let class = &definition.class_name;
    claim(definition, &mut scope, class, class)?;
    Ok(scope)
}

// =============================================================================
// Emitters
// =============================================================================

/// Renders an [`EmissionModel`] into source text for one target language
pub trait Emitter {
    /// File extension of generated files, without the dot
    fn extension(&self) -> &str;

    /// File name (without directories) for a model
    fn file_name(&self, model: &EmissionModel) -> String;

    /// Full generated file content
    fn emit(&self, model: &EmissionModel) -> String;

    /// Path of the generated file relative to the output root
    fn relative_path(&self, model: &EmissionModel) -> PathBuf {
        let mut path: PathBuf = model.output_dir.iter().collect();
        path.push(self.file_name(model));
        path
    }
}
