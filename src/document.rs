//! Definition document decoding
//!
//! Definition files are decoded once into a generic [`Document`] (TOML or
//! JSON, chosen by extension). Key order of maps is preserved so inline data
//! keeps the order it was written in.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ResourceError, Result};

/// A decoded, dynamically shaped definition document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Map<String, Value>,
}

/// Supported definition text formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    /// Format implied by a file extension. Anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl Document {
    /// Read and decode a definition file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ResourceError::io(path, e))?;
        Self::decode(path, &text, DocumentFormat::from_path(path))
    }

    /// Decode definition text. `path` is only used for error reporting.
    pub fn decode(path: &Path, text: &str, format: DocumentFormat) -> Result<Self> {
        let value: Value = match format {
            DocumentFormat::Json => serde_json::from_str(text).map_err(|e| decode_error(path, e))?,
            DocumentFormat::Toml => toml::from_str(text).map_err(|e| decode_error(path, e))?,
        };
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(ResourceError::Decode {
                file: path.to_path_buf(),
                message: "top level must be a map".to_string(),
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.root.get(field)
    }

    /// String field; `None` when absent, error when present with another type
    pub fn get_str(&self, path: &Path, field: &str) -> Result<Option<&str>> {
        match self.root.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ResourceError::configuration(
                path,
                format!("field '{}' must be a string", field),
            )),
        }
    }

    /// Required string field
    pub fn require_str(&self, path: &Path, field: &str) -> Result<&str> {
        self.get_str(path, field)?.ok_or_else(|| {
            ResourceError::configuration(path, format!("missing required field '{}'", field))
        })
    }

    /// Required map field
    pub fn require_map(&self, path: &Path, field: &str) -> Result<&Map<String, Value>> {
        match self.root.get(field) {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(ResourceError::configuration(
                path,
                format!("field '{}' must be a map", field),
            )),
            None => Err(ResourceError::configuration(
                path,
                format!("missing required field '{}'", field),
            )),
        }
    }
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> ResourceError {
    ResourceError::Decode {
        file: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_toml_preserves_order() {
        let doc = Document::decode(
            Path::new("messages.toml"),
            "class = \"Messages\"\n[data]\nzeta = \"z\"\nalpha = \"a\"\nmid = \"m\"\n",
            DocumentFormat::Toml,
        )
        .unwrap();
        let keys: Vec<&String> = doc
            .require_map(Path::new("messages.toml"), "data")
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_json_fields() {
        let path = Path::new("messages.json");
        let text = r#"{"class": "Messages", "type": 3}"#;
        let doc = Document::decode(path, text, DocumentFormat::Json).unwrap();
        assert_eq!(doc.require_str(path, "class").unwrap(), "Messages");
        assert_eq!(doc.get_str(path, "missing").unwrap(), None);
        assert_eq!(doc.get_str(path, "type").unwrap_err().kind(), ErrorKind::Configuration);
        assert_eq!(doc.require_map(path, "data").unwrap_err().kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_decode_failure() {
        let err =
            Document::decode(Path::new("bad.json"), "{not json", DocumentFormat::Json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err =
            Document::decode(Path::new("list.json"), "[1, 2]", DocumentFormat::Json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("a.toml")), DocumentFormat::Toml);
        assert_eq!(DocumentFormat::from_path(Path::new("a")), DocumentFormat::Toml);
    }
}
