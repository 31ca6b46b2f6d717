//! Rust Code Emitter
//!
//! Renders an [`EmissionModel`] as a Rust module.
//!
//! Key constraints:
//! - This module ONLY receives the EmissionModel - no definitions, no raw sources
//! - Identifiers arrive already normalized and collision-checked
//! - String values are written as escaped Rust literals

use super::names::to_snake_case;
use super::{Constant, ConstantValue, EmissionModel, Emitter, KeyModule, VersionLookup};
use crate::checksum::Fingerprint;

/// Emits one `.rs` file per model
#[derive(Debug, Clone, Copy, Default)]
pub struct RustEmitter;

impl RustEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for RustEmitter {
    fn extension(&self) -> &str {
        "rs"
    }

    fn file_name(&self, model: &EmissionModel) -> String {
        format!("{}.{}", to_snake_case(&model.class_name), self.extension())
    }

    fn emit(&self, model: &EmissionModel) -> String {
        let body = emit_body(model);
        let mut output = emit_header(model, &Fingerprint::of(&body));
        output.push_str(&body);
        output
    }
}

// =============================================================================
// Header
// =============================================================================

fn emit_header(model: &EmissionModel, fingerprint: &Fingerprint) -> String {
    let mut output = String::new();
    let source = model
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| model.source.display().to_string());

    let mut module_path = model.namespace_path.clone();
    module_path.push(to_snake_case(&model.class_name));

    output.push_str(&format!("//! Generated by resgen from {} - DO NOT EDIT\n", source));
    output.push_str("//!\n");
    output.push_str(&format!("//! Module path: {}\n", module_path.join("::")));
    output.push_str(&fingerprint.header_line());
    output.push_str("\n\n");
    output
}

// =============================================================================
// Body
// =============================================================================

fn emit_body(model: &EmissionModel) -> String {
    let mut output = String::new();

    match &model.lookup {
        Some(lookup) => {
            output.push_str("/// Versioned resource values\n");
            output.push_str(&format!("pub struct {};\n\n", model.class_name));
            output.push_str(&format!("impl {} {{\n", model.class_name));
            emit_constants(&mut output, &model.constants);
            output.push('\n');
            emit_lookup(&mut output, lookup);
            output.push_str("}\n");
        }
        None => {
            output.push_str("/// Resource constants\n");
            output.push_str(&format!("pub struct {};\n\n", model.class_name));
            output.push_str(&format!("impl {} {{\n", model.class_name));
            emit_constants(&mut output, &model.constants);
            output.push_str("}\n");
        }
    }

    for module in &model.key_modules {
        output.push('\n');
        emit_key_module(&mut output, module, &model.class_name);
    }

    output
}

fn emit_constants(output: &mut String, constants: &[Constant]) {
    for constant in constants {
        match &constant.value {
            ConstantValue::Index(index) => {
                output.push_str(&format!("    pub const {}: usize = {};\n", constant.name, index));
            }
            ConstantValue::Str(value) => {
                output.push_str(&format!(
                    "    pub const {}: &'static str = {:?};\n",
                    constant.name, value
                ));
            }
        }
    }
}

fn emit_lookup(output: &mut String, lookup: &VersionLookup) {
    let versions = lookup.table.versions();
    let width = lookup.table.identifiers().len();

    output.push_str(&format!(
        "    const DEFAULT_VERSION: &'static str = {:?};\n",
        lookup.default_version
    ));

    output.push_str(&format!(
        "    const ALLOWED_VERSIONS: [&'static str; {}] = [",
        lookup.allowed_versions.len()
    ));
    let allowed: Vec<String> = lookup.allowed_versions.iter().map(|v| format!("{:?}", v)).collect();
    output.push_str(&allowed.join(", "));
    output.push_str("];\n");

    // One row per version, in ALLOWED_VERSIONS order
    output.push_str(&format!(
        "    const VALUES: [[&'static str; {}]; {}] = [\n",
        width,
        versions.len()
    ));
    for version in versions {
        output.push_str(&format!("        // {}\n", version.name));
        output.push_str("        [\n");
        for value in &version.values {
            output.push_str(&format!("            {:?},\n", value));
        }
        output.push_str("        ],\n");
    }
    output.push_str("    ];\n\n");

    output.push_str("    /// Value of `key` in `version`, if both are known\n");
    output.push_str("    pub fn get_value(key: usize, version: &str) -> Option<&'static str> {\n");
    output.push_str("        let row = Self::ALLOWED_VERSIONS.iter().position(|v| *v == version)?;\n");
    output.push_str("        Self::VALUES[row].get(key).copied()\n");
    output.push_str("    }\n\n");

    output.push_str("    pub fn has_value(key: usize, version: &str) -> bool {\n");
    output.push_str("        Self::get_value(key, version).is_some()\n");
    output.push_str("    }\n\n");

    output.push_str("    pub fn default_version() -> &'static str {\n");
    output.push_str("        Self::DEFAULT_VERSION\n");
    output.push_str("    }\n\n");

    output.push_str("    pub fn is_version_allowed(version: &str) -> bool {\n");
    output.push_str("        Self::ALLOWED_VERSIONS.contains(&version)\n");
    output.push_str("    }\n\n");

    output.push_str("    pub fn allowed_versions() -> &'static [&'static str] {\n");
    output.push_str("        &Self::ALLOWED_VERSIONS\n");
    output.push_str("    }\n");
}

fn emit_key_module(output: &mut String, module: &KeyModule, class_name: &str) {
    output.push_str(&format!(
        "/// Keys of table `{}`, for use with [`{}::get_value`]\n",
        module.table, class_name
    ));
    output.push_str(&format!("pub struct {};\n\n", module.name));
    output.push_str(&format!("impl {} {{\n", module.name));
    emit_constants(output, &module.constants);
    output.push_str("}\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{KeyNormalizer, ModelBuilder, NamingConfig};
    use crate::definition::{DefinitionBody, RawVersionSource, ResourceDefinition, SourceKind};
    use crate::reconcile::Reconciler;
    use std::path::{Path, PathBuf};

    fn records(pairs: &[(&str, &str)]) -> crate::tabular::Records {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn values_model(versions: Vec<(&str, RawVersionSource)>) -> EmissionModel {
        let versions: Vec<(String, RawVersionSource)> =
            versions.into_iter().map(|(n, s)| (n.to_string(), s)).collect();
        let definition = ResourceDefinition {
            source: PathBuf::from("defs/messages.toml"),
            class_name: "PageMessages".to_string(),
            namespace_path: vec!["crate".to_string(), "generated".to_string(), "ui".to_string()],
            add_namespace: vec!["ui".to_string()],
            source_kind: SourceKind::InlineLiteral,
            version_key_prefix: None,
            body: DefinitionBody::Values {
                versions: versions.clone(),
                default_version: "en".to_string(),
            },
        };
        let normalizer = KeyNormalizer::new(NamingConfig::default());
        let (keys, table) = Reconciler::new(&normalizer).reconcile(&versions, "en").unwrap();
        ModelBuilder::new(&normalizer)
            .build(&definition, &keys, table, "en")
            .unwrap()
    }

    #[test]
    fn test_emit_flat_values() {
        let model = values_model(vec![
            (
                "en",
                RawVersionSource::Literal(records(&[("greeting", "Hello \"you\""), ("bye", "Bye")])),
            ),
            (
                "de",
                RawVersionSource::Literal(records(&[("bye", "Tschuess"), ("greeting", "Hallo")])),
            ),
        ]);
        let code = RustEmitter::new().emit(&model);

        assert!(code.starts_with("//! Generated by resgen from messages.toml - DO NOT EDIT\n"));
        assert!(code.contains("//! Module path: crate::generated::ui::page_messages\n"));
        assert!(code.contains("pub struct PageMessages;"));
        assert!(code.contains("    pub const GREETING: usize = 0;\n"));
        assert!(code.contains("    pub const BYE: usize = 1;\n"));
        assert!(code.contains("    pub const VERSION_DE: &'static str = \"de\";\n"));
        assert!(code.contains("const ALLOWED_VERSIONS: [&'static str; 2] = [\"en\", \"de\"];"));
        assert!(code.contains("const VALUES: [[&'static str; 2]; 2] = ["));
        assert!(code.contains("\"Hello \\\"you\\\"\","));
        assert!(code.contains("pub fn get_value(key: usize, version: &str) -> Option<&'static str>"));
        assert!(code.contains("pub fn is_version_allowed(version: &str) -> bool"));

        // Rows follow canonical key order regardless of source order
        let hallo = code.find("\"Hallo\"").unwrap();
        let tschuess = code.find("\"Tschuess\"").unwrap();
        assert!(hallo < tschuess);
    }

    #[test]
    fn test_emit_grouped_values() {
        let model = values_model(vec![(
            "en",
            RawVersionSource::Grouped(vec![
                ("user".to_string(), records(&[("first_name", "First")])),
                ("nav_bar".to_string(), records(&[("home", "Home")])),
            ]),
        )]);
        let code = RustEmitter::new().emit(&model);

        assert!(code.contains("pub struct User;"));
        assert!(code.contains("pub struct NavBar;"));
        assert!(code.contains("    pub const FIRST_NAME: usize = 0;\n"));
        assert!(code.contains("    pub const HOME: usize = 1;\n"));
        assert!(!code.contains("USER_FIRST_NAME"));
    }

    #[test]
    fn test_fingerprint_covers_body() {
        let model = values_model(vec![("en", RawVersionSource::Literal(records(&[("a", "1")])))]);
        let code = RustEmitter::new().emit(&model);
        let (fingerprint, body) = Fingerprint::extract(&code).unwrap();
        assert!(fingerprint.verify(body));
        assert!(body.starts_with("/// Versioned resource values\n"));

        let edited = code.replace("\"1\"", "\"2\"");
        let (stamped, edited_body) = Fingerprint::extract(&edited).unwrap();
        assert!(!stamped.verify(edited_body));
    }

    #[test]
    fn test_emit_is_deterministic() {
        let build = || {
            values_model(vec![
                ("en", RawVersionSource::Literal(records(&[("a", "1"), ("b", "2")]))),
                ("fr", RawVersionSource::Literal(records(&[("a", "un"), ("b", "deux")]))),
            ])
        };
        let emitter = RustEmitter::new();
        assert_eq!(emitter.emit(&build()), emitter.emit(&build()));
    }

    #[test]
    fn test_relative_path() {
        let model = values_model(vec![("en", RawVersionSource::Literal(records(&[("a", "1")])))]);
        assert_eq!(
            RustEmitter::new().relative_path(&model),
            Path::new("ui").join("page_messages.rs")
        );
    }
}
