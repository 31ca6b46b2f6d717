//! Definition Loading
//!
//! Maps a decoded [`Document`] onto a typed [`ResourceDefinition`]. This is the
//! only place that looks at the dynamic document shape; everything after it
//! works on [`RawVersionSource`] variants.
//!
//! Recognized fields: `class`, `type`, `data`, `versions`, `defaultVersion`,
//! `addNamespace`, `versionKeyPrefix`. Unknown fields are ignored.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{split_namespace, Configuration};
use crate::document::Document;
use crate::error::{ResourceError, Result};
use crate::tabular::{Records, TabularReader};

// =============================================================================
// Types
// =============================================================================

/// Which generator a definition is compiled by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// Plain string constants from a single `data` source
    Constants,
    /// Versioned lookup table from `versions`
    Values,
}

impl fmt::Display for GeneratorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constants => write!(f, "constants"),
            Self::Values => write!(f, "values"),
        }
    }
}

/// Data source kind, from the `type` discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    /// `in-place`: data written inline in the definition
    InlineLiteral,
    /// `csv`: one scalar per line
    FlatList,
    /// `csv-named`: `key,value` per line
    KeyedTable,
    /// `csv-grouped`: a directory with one keyed table per file
    GroupedKeyedTable,
}

impl SourceKind {
    pub fn parse(discriminator: &str) -> Option<Self> {
        match discriminator {
            "in-place" => Some(Self::InlineLiteral),
            "csv" => Some(Self::FlatList),
            "csv-named" => Some(Self::KeyedTable),
            "csv-grouped" => Some(Self::GroupedKeyedTable),
            _ => None,
        }
    }
}

/// Data of one version (or of a constants definition), already loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawVersionSource {
    /// Inline key -> scalar map
    Literal(Records),
    /// Ordered scalars; keys come from the default version
    List(Vec<String>),
    /// Key -> value records read from one table file
    Keyed(Records),
    /// Table name -> (field -> value)
    Grouped(Vec<(String, Records)>),
}

impl RawVersionSource {
    pub fn is_grouped(&self) -> bool {
        matches!(self, Self::Grouped(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Literal(records) | Self::Keyed(records) => records.len(),
            Self::List(list) => list.len(),
            Self::Grouped(tables) => tables.iter().map(|(_, fields)| fields.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a definition contributes, depending on its generator mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionBody {
    Constants(RawVersionSource),
    Values {
        /// Versions in document order; names are unique
        versions: Vec<(String, RawVersionSource)>,
        default_version: String,
    },
}

/// One compilation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDefinition {
    /// Definition file this was loaded from
    pub source: PathBuf,

    pub class_name: String,

    /// Full module path, `addNamespace` segments included
    pub namespace_path: Vec<String>,

    /// `addNamespace` segments alone; these also become output sub-directories
    pub add_namespace: Vec<String>,

    pub source_kind: SourceKind,

    /// Per-definition override of the version constant prefix
    pub version_key_prefix: Option<String>,

    pub body: DefinitionBody,
}

impl ResourceDefinition {
    pub fn mode(&self) -> GeneratorMode {
        match self.body {
            DefinitionBody::Constants(_) => GeneratorMode::Constants,
            DefinitionBody::Values { .. } => GeneratorMode::Values,
        }
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Loads definition files into [`ResourceDefinition`]s
#[derive(Debug, Clone)]
pub struct DefinitionLoader {
    namespace_root: Vec<String>,
    reader: TabularReader,
}

impl DefinitionLoader {
    pub fn new(configuration: &Configuration, reader: TabularReader) -> Self {
        Self {
            namespace_root: configuration.namespace_segments(),
            reader,
        }
    }

    /// Decode and load a definition file
    pub fn load_file(&self, path: &Path, mode: GeneratorMode) -> Result<ResourceDefinition> {
        let document = Document::from_file(path)?;
        self.load(path, &document, mode)
    }

    /// Load a decoded definition. Relative data paths resolve against the
    /// directory containing `path`.
    pub fn load(
        &self,
        path: &Path,
        document: &Document,
        mode: GeneratorMode,
    ) -> Result<ResourceDefinition> {
        let class_name = document.require_str(path, "class")?.to_string();
        if class_name.trim().is_empty() {
            return Err(ResourceError::configuration(path, "field 'class' must not be empty"));
        }

        let discriminator = document.require_str(path, "type")?;
        let source_kind = SourceKind::parse(discriminator).ok_or_else(|| {
            ResourceError::configuration(path, format!("unknown type '{}'", discriminator))
        })?;

        let add_namespace = document
            .get_str(path, "addNamespace")?
            .map(split_namespace)
            .unwrap_or_default();
        let mut namespace_path = self.namespace_root.clone();
        namespace_path.extend(add_namespace.iter().cloned());

        let version_key_prefix = document.get_str(path, "versionKeyPrefix")?.map(str::to_string);

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let body = match mode {
            GeneratorMode::Constants => {
                let data = document.get("data").ok_or_else(|| {
                    ResourceError::configuration(path, "missing required field 'data'")
                })?;
                let source = self.load_constants_source(path, dir, source_kind, data)?;
                DefinitionBody::Constants(source)
            }
            GeneratorMode::Values => self.load_versions(path, dir, source_kind, document)?,
        };

        debug!(
            definition = %path.display(),
            class = %class_name,
            mode = %mode,
            "loaded definition"
        );

        Ok(ResourceDefinition {
            source: path.to_path_buf(),
            class_name,
            namespace_path,
            add_namespace,
            source_kind,
            version_key_prefix,
            body,
        })
    }

    fn load_constants_source(
        &self,
        path: &Path,
        dir: &Path,
        kind: SourceKind,
        data: &Value,
    ) -> Result<RawVersionSource> {
        match kind {
            SourceKind::InlineLiteral => {
                let map = expect_map(path, "data", data)?;
                Ok(RawVersionSource::Literal(flat_records(path, "data", map)?))
            }
            SourceKind::FlatList => {
                let file = resolve(dir, expect_path(path, "data", data)?);
                Ok(RawVersionSource::List(self.reader.read_list(&file)?))
            }
            SourceKind::KeyedTable => {
                let file = resolve(dir, expect_path(path, "data", data)?);
                Ok(RawVersionSource::Keyed(self.reader.read_keyed(&file)?))
            }
            SourceKind::GroupedKeyedTable => Err(ResourceError::configuration(
                path,
                "type 'csv-grouped' is only supported for versioned values",
            )),
        }
    }

    fn load_versions(
        &self,
        path: &Path,
        dir: &Path,
        kind: SourceKind,
        document: &Document,
    ) -> Result<DefinitionBody> {
        let default_version = document.require_str(path, "defaultVersion")?.to_string();
        let entries = document.require_map(path, "versions")?;

        if !entries.contains_key(&default_version) {
            return Err(ResourceError::configuration(
                path,
                format!("default version '{}' is not one of the versions", default_version),
            ));
        }

        // Inline definitions are grouped when the default version nests maps
        let grouped_inline = kind == SourceKind::InlineLiteral
            && matches!(
                entries.get(&default_version),
                Some(Value::Object(map)) if map.values().any(Value::is_object)
            );

        let mut versions = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            let field = format!("versions.{}", name);
            let source = match kind {
                SourceKind::InlineLiteral => {
                    let map = expect_map(path, &field, entry)?;
                    if grouped_inline {
                        RawVersionSource::Grouped(grouped_records(path, &field, map)?)
                    } else {
                        RawVersionSource::Literal(flat_records(path, &field, map)?)
                    }
                }
                SourceKind::FlatList => {
                    let file = resolve(dir, expect_path(path, &field, entry)?);
                    RawVersionSource::List(self.reader.read_list(&file)?)
                }
                SourceKind::KeyedTable => {
                    let file = resolve(dir, expect_path(path, &field, entry)?);
                    RawVersionSource::Keyed(self.reader.read_keyed(&file)?)
                }
                SourceKind::GroupedKeyedTable => {
                    let table_dir = resolve(dir, expect_path(path, &field, entry)?);
                    RawVersionSource::Grouped(self.read_table_dir(path, &table_dir)?)
                }
            };
            debug!(version = %name, entries = source.len(), "loaded version");
            versions.push((name.clone(), source));
        }

        Ok(DefinitionBody::Values {
            versions,
            default_version,
        })
    }

    /// One keyed table per regular file, named by file stem, in file-name order
    fn read_table_dir(&self, path: &Path, table_dir: &Path) -> Result<Vec<(String, Records)>> {
        if !table_dir.is_dir() {
            return Err(ResourceError::configuration(
                path,
                format!("'{}' is not a directory", table_dir.display()),
            ));
        }

        let mut tables = Vec::new();
        let mut seen = HashSet::new();
        for entry in WalkDir::new(table_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                ResourceError::io(table_dir, source)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if file_name.starts_with('.') {
                continue;
            }

            let table = entry
                .path()
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !seen.insert(table.clone()) {
                return Err(ResourceError::configuration(
                    path,
                    format!(
                        "table '{}' is defined by more than one file in {}",
                        table,
                        table_dir.display()
                    ),
                ));
            }
            tables.push((table, self.reader.read_keyed(entry.path())?));
        }
        Ok(tables)
    }
}

// =============================================================================
// Document helpers
// =============================================================================

fn resolve(dir: &Path, relative: &str) -> PathBuf {
    let relative = Path::new(relative);
    if relative.is_absolute() {
        relative.to_path_buf()
    } else {
        dir.join(relative)
    }
}

fn expect_map<'a>(path: &Path, field: &str, value: &'a Value) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        ResourceError::configuration(path, format!("field '{}' must be a map", field))
    })
}

fn expect_path<'a>(path: &Path, field: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        ResourceError::configuration(path, format!("field '{}' must be a file path", field))
    })
}

/// Textual form of an inline scalar
fn scalar(path: &Path, field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ResourceError::configuration(
            path,
            format!("field '{}' must be a string, number or boolean", field),
        )),
    }
}

fn flat_records(path: &Path, field: &str, map: &Map<String, Value>) -> Result<Records> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), scalar(path, &format!("{}.{}", field, key), value)?)))
        .collect()
}

fn grouped_records(
    path: &Path,
    field: &str,
    map: &Map<String, Value>,
) -> Result<Vec<(String, Records)>> {
    map.iter()
        .map(|(table, fields)| {
            let table_field = format!("{}.{}", field, table);
            let fields = expect_map(path, &table_field, fields)?;
            Ok((table.clone(), flat_records(path, &table_field, fields)?))
        })
        .collect()
}
