//! Run configuration
//!
//! A run is described by a manifest file (TOML or JSON) next to the
//! resource definitions it lists:
//!
//! ```toml
//! output = "src/generated"
//! namespace = "crate::generated"
//!
//! constants = ["colors.toml"]
//! values = ["messages.toml", "labels.toml"]
//!
//! [naming]
//! version_key_prefix = "VERSION_"
//! separator = ","
//! list_mode = "first-field"
//! ```
//!
//! Any field may be overridden from the environment: `RESGEN_OUTPUT`,
//! `RESGEN_NAMESPACE`, and `RESGEN_NAMING__SEPARATOR` for nested tables.

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codegen::config::NamingConfig;
use crate::error::{ResourceError, Result};

/// The three directives every run needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Root directory for generated files, relative to `base_dir`
    pub output_root: PathBuf,

    /// Module path all generated modules live under (`crate::generated`)
    pub namespace_root: String,

    /// Directory relative definition and output paths are resolved against
    pub base_dir: PathBuf,
}

impl Configuration {
    pub fn new(
        output_root: impl Into<PathBuf>,
        namespace_root: impl Into<String>,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            namespace_root: namespace_root.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Namespace root split into segments. Accepts `::` as well as `\` separators.
    pub fn namespace_segments(&self) -> Vec<String> {
        split_namespace(&self.namespace_root)
    }

    /// Absolute (or `base_dir`-relative) output directory
    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(&self.output_root)
    }

    /// Resolve a manifest-relative path
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.base_dir.join(relative)
        }
    }
}

/// Split a module path on `::` or `\`, dropping empty segments
pub fn split_namespace(namespace: &str) -> Vec<String> {
    namespace
        .split("::")
        .flat_map(|part| part.split('\\'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Manifest
// =============================================================================

/// A loaded run manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Path of the manifest file itself
    pub path: PathBuf,

    pub configuration: Configuration,

    pub naming: NamingConfig,

    /// Definitions compiled to plain string constants
    pub constants: Vec<PathBuf>,

    /// Definitions compiled to versioned lookup modules
    pub values: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    output: Option<PathBuf>,
    namespace: Option<String>,
    #[serde(default)]
    constants: Vec<PathBuf>,
    #[serde(default)]
    values: Vec<PathBuf>,
    #[serde(default)]
    naming: NamingConfig,
}

/// Environment overrides: `RESGEN_OUTPUT`, `RESGEN_NAMING__SEPARATOR`, ...
fn environment() -> Environment {
    Environment::with_prefix("RESGEN")
        .prefix_separator("_")
        .separator("__")
}

impl Manifest {
    /// Load a manifest, layering environment overrides on top of the file
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: &Path, environment: Environment) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(environment)
            .build()
            .map_err(|e| ResourceError::configuration(path, e.to_string()))?;

        let raw: RawManifest = settings
            .try_deserialize()
            .map_err(|e| ResourceError::configuration(path, e.to_string()))?;

        Self::from_raw(path, raw)
    }

    fn from_raw(path: &Path, raw: RawManifest) -> Result<Self> {
        let output = raw.output.ok_or_else(|| missing(path, "output"))?;
        let namespace = raw.namespace.ok_or_else(|| missing(path, "namespace"))?;
        if raw.naming.separator == '#' {
            return Err(ResourceError::configuration(
                path,
                "separator '#' clashes with comment lines",
            ));
        }
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            configuration: Configuration::new(output, namespace, base_dir),
            naming: raw.naming,
            constants: raw.constants,
            values: raw.values,
        })
    }
}

fn missing(path: &Path, field: &str) -> ResourceError {
    ResourceError::configuration(path, format!("missing required field '{}'", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::config::ListMode;
    use crate::error::ErrorKind;
    use std::fs;

    #[test]
    fn test_split_namespace() {
        assert_eq!(split_namespace("crate::generated"), vec!["crate", "generated"]);
        assert_eq!(split_namespace("App\\Resources"), vec!["App", "Resources"]);
        assert_eq!(split_namespace(""), Vec::<String>::new());
    }

    #[test]
    fn test_resolve() {
        let config = Configuration::new("out", "crate", "/defs");
        assert_eq!(config.resolve(Path::new("a.toml")), PathBuf::from("/defs/a.toml"));
        assert_eq!(config.resolve(Path::new("/abs/a.toml")), PathBuf::from("/abs/a.toml"));
        assert_eq!(config.output_dir(), PathBuf::from("/defs/out"));
    }

    #[test]
    fn test_load_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resgen.toml");
        fs::write(
            &path,
            "output = \"generated\"\nnamespace = \"crate::generated\"\nvalues = [\"messages.toml\"]\n\n[naming]\nversion_key_prefix = \"LANG_\"\nseparator = \";\"\n",
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.configuration.output_root, PathBuf::from("generated"));
        assert_eq!(manifest.configuration.base_dir, dir.path());
        assert_eq!(manifest.values, vec![PathBuf::from("messages.toml")]);
        assert!(manifest.constants.is_empty());
        assert_eq!(manifest.naming.version_key_prefix, "LANG_");
        assert_eq!(manifest.naming.separator, ';');
        assert_eq!(manifest.naming.list_mode, ListMode::FirstField);
    }

    fn write_manifest(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("resgen.toml");
        fs::write(&path, text).unwrap();
        path
    }

    fn overrides(vars: &[(&str, &str)]) -> Environment {
        let vars: config_crate::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn test_environment_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "output = \"generated\"\nnamespace = \"crate::generated\"\n",
        );

        let env = overrides(&[
            ("RESGEN_OUTPUT", "src/resources"),
            ("RESGEN_NAMING__SEPARATOR", ";"),
            ("OTHER_OUTPUT", "ignored"),
        ]);
        let manifest = Manifest::load_with(&path, env).unwrap();
        assert_eq!(manifest.configuration.output_root, PathBuf::from("src/resources"));
        assert_eq!(manifest.configuration.namespace_root, "crate::generated");
        assert_eq!(manifest.naming.separator, ';');

        let manifest = Manifest::load_with(&path, overrides(&[])).unwrap();
        assert_eq!(manifest.configuration.output_root, PathBuf::from("generated"));
    }

    #[test]
    fn test_environment_supplies_required_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), "output = \"generated\"\n");
        assert!(Manifest::load_with(&path, overrides(&[])).is_err());

        let env = overrides(&[("RESGEN_NAMESPACE", "crate::res")]);
        let manifest = Manifest::load_with(&path, env).unwrap();
        assert_eq!(manifest.configuration.namespace_segments(), vec!["crate", "res"]);
    }

    #[test]
    fn test_manifest_requires_output() {
        let raw = RawManifest {
            output: None,
            namespace: Some("crate".to_string()),
            constants: Vec::new(),
            values: Vec::new(),
            naming: NamingConfig::default(),
        };
        let err = Manifest::from_raw(Path::new("resgen.toml"), raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_bad_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "output = \"out\"\nnamespace = \"crate\"\n\n[naming]\nseparator = \"#\"\n",
        );
        let err = Manifest::load_with(&path, overrides(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let path = write_manifest(
            dir.path(),
            "output = \"out\"\nnamespace = \"crate\"\n\n[naming]\nseparator = \"::\"\n",
        );
        assert!(Manifest::load_with(&path, overrides(&[])).is_err());
    }

    #[test]
    fn test_list_mode_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "output = \"out\"\nnamespace = \"crate\"\n\n[naming]\nlist_mode = \"whole-line\"\n",
        );
        let manifest = Manifest::load_with(&path, overrides(&[])).unwrap();
        assert_eq!(manifest.naming.list_mode, ListMode::WholeLine);
        assert_eq!(manifest.naming.version_key_prefix, "VERSION_");
    }
}
