//! Key Normalization
//!
//! Derives generated identifiers from raw resource keys:
//! - Constant names: upper-cased, `-` translated to `_` (`full-name` -> `FULL_NAME`)
//! - Grouped keys: `UPPER(table)_UPPER(field)` (`user`, `first_name` -> `USER_FIRST_NAME`)
//! - Version constants: `<prefix>UPPER(version)` (`en` -> `VERSION_EN`)
//! - Type names: PascalCase from underscore/dash delimited words (`full_name` -> `FullName`)
//!
//! Normalization is deterministic. Injectivity is enforced per definition by
//! [`IdentifierRegistry`]: two raw keys claiming the same identifier is an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::config::NamingConfig;
use crate::error::{ResourceError, Result};

// =============================================================================
// Key Normalizer
// =============================================================================

/// Turns raw keys into constant and type identifiers
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    config: NamingConfig,
}

impl KeyNormalizer {
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Constant identifier for a flat key
    pub fn normalize(&self, raw_key: &str) -> String {
        constant_case(raw_key)
    }

    /// Flattened constant identifier for a grouped `(table, field)` key
    pub fn normalize_grouped(&self, table: &str, field: &str) -> String {
        format!("{}_{}", constant_case(table), constant_case(field))
    }

    /// Constant identifier carrying a version name
    pub fn version_constant(&self, version: &str) -> String {
        format!("{}{}", self.config.version_key_prefix, constant_case(version))
    }

    /// Type name for a per-table key module
    pub fn type_name(&self, raw: &str) -> String {
        to_pascal_case(raw)
    }
}

/// Upper-case with `-` mapped to `_`
pub fn constant_case(raw: &str) -> String {
    raw.replace('-', "_").to_uppercase()
}

fn word_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[_\-\s]+([A-Za-z0-9])").expect("valid boundary regex"))
}

/// Underscore-delimited to camelCase (`full_name` -> `fullName`)
pub fn to_camel_case(s: &str) -> String {
    word_boundary()
        .replace_all(s, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

/// Underscore-delimited to PascalCase (`full_name` -> `FullName`)
pub fn to_pascal_case(s: &str) -> String {
    let camel = to_camel_case(s);
    let mut chars = camel.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// CamelCase or PascalCase to snake_case (`PageTitles` -> `page_titles`)
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c == '-' || c == ' ' {
            result.push('_');
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }

    result
}

/// Strict and reserved keywords of the 2021 edition
const RUST_KEYWORDS: &[&str] = &[
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Whether `s` can be used verbatim as a Rust identifier
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let well_formed = match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            s != "_" && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    };
    well_formed && !RUST_KEYWORDS.contains(&s)
}

// =============================================================================
// Identifier Registry
// =============================================================================

/// Tracks which raw key produced each identifier within one generated scope
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    owners: HashMap<String, String>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `raw` maps to `identifier`.
    ///
    /// Fails when a different raw key already claimed the identifier.
    pub fn claim(&mut self, identifier: &str, raw: &str) -> Result<()> {
        match self.owners.get(identifier) {
            Some(owner) => Err(ResourceError::DuplicateIdentifier {
                identifier: identifier.to_string(),
                first: owner.clone(),
                second: raw.to_string(),
            }),
            None => {
                self.owners.insert(identifier.to_string(), raw.to_string());
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
