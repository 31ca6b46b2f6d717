//! Codegen Configuration
//!
//! Explicit defaults for everything the pipeline would otherwise treat as
//! ambient state: the version constant prefix, the tabular field separator
//! and how flat lists are read.
//!
//! Per-definition options (`versionKeyPrefix`) are layered on top with
//! [`NamingConfig::with_version_key_prefix`].

use serde::{Deserialize, Serialize};

// =============================================================================
// Naming Configuration
// =============================================================================

/// Default prefix for the synthesized per-version constants
pub const DEFAULT_VERSION_KEY_PREFIX: &str = "VERSION_";

/// Default tabular field separator
pub const DEFAULT_SEPARATOR: char = ',';

/// Naming and parsing configuration shared by one compilation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Prefix for version constants (`VERSION_EN` for version `en`)
    #[serde(default = "default_version_key_prefix")]
    pub version_key_prefix: String,

    /// Field separator for tabular files
    #[serde(default = "default_separator")]
    pub separator: char,

    /// How list-mode tabular reads pick the element of a line
    #[serde(default)]
    pub list_mode: ListMode,
}

/// Element selection for list-mode tabular reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListMode {
    /// Text before the first separator, or the whole line without one
    #[default]
    FirstField,
    /// The whole trimmed line, separators included
    WholeLine,
}

fn default_version_key_prefix() -> String {
    DEFAULT_VERSION_KEY_PREFIX.to_string()
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            version_key_prefix: default_version_key_prefix(),
            separator: default_separator(),
            list_mode: ListMode::default(),
        }
    }
}

impl NamingConfig {
    /// Copy of this config with a definition-level prefix override applied
    pub fn with_version_key_prefix(&self, prefix: Option<&str>) -> Self {
        match prefix {
            Some(prefix) => Self {
                version_key_prefix: prefix.to_string(),
                ..self.clone()
            },
            None => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NamingConfig::default();
        assert_eq!(config.version_key_prefix, "VERSION_");
        assert_eq!(config.separator, ',');
        assert_eq!(config.list_mode, ListMode::FirstField);
    }

    #[test]
    fn test_prefix_override() {
        let config = NamingConfig::default();
        assert_eq!(config.with_version_key_prefix(Some("LANG_")).version_key_prefix, "LANG_");
        assert_eq!(config.with_version_key_prefix(None), config);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: NamingConfig = serde_json::from_str(r#"{"list_mode": "whole-line"}"#).unwrap();
        assert_eq!(config.list_mode, ListMode::WholeLine);
        assert_eq!(config.version_key_prefix, "VERSION_");
    }
}
