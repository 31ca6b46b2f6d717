//! Version Reconciliation
//!
//! The default version is the authority for which keys exist and in which
//! order. Every other version must provide exactly that key set: a missing key
//! fails with [`ResourceError::MissingKeyInVersion`], leftovers fail with
//! [`ResourceError::UndefinedKeysFound`]. Versions are checked in document
//! order and the first failure is returned.
//!
//! Grouped sources are reconciled twice: table names first, then the fields
//! of each table (reported as `table.field`).
//!
//! The result is a [`NormalizedVersionTable`] whose versions all share a single
//! identifier list, so symmetric key sets hold by construction.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::codegen::names::{IdentifierRegistry, KeyNormalizer};
use crate::definition::RawVersionSource;
use crate::error::{ResourceError, Result};
use crate::tabular::Records;

// =============================================================================
// Canonical Keys
// =============================================================================

/// Key layout of a grouped source's table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalTable {
    pub name: String,
    pub fields: Vec<String>,
}

/// Raw keys of the default version, in its order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", content = "keys", rename_all = "lowercase")]
pub enum CanonicalKeySet {
    Flat(Vec<String>),
    Grouped(Vec<CanonicalTable>),
}

impl CanonicalKeySet {
    /// Number of leaf keys
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(keys) => keys.len(),
            Self::Grouped(tables) => tables.iter().map(|t| t.fields.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, Self::Grouped(_))
    }

    /// Leaf keys in canonical order; grouped keys render as `table.field`
    pub fn raw_keys(&self) -> Vec<String> {
        match self {
            Self::Flat(keys) => keys.clone(),
            Self::Grouped(tables) => tables
                .iter()
                .flat_map(|t| t.fields.iter().map(move |f| grouped_label(&t.name, f)))
                .collect(),
        }
    }
}

// =============================================================================
// Normalized Version Table
// =============================================================================

/// Values of one version, aligned with [`NormalizedVersionTable::identifiers`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionValues {
    pub name: String,
    pub values: Vec<String>,
}

/// version -> constant identifier -> value, with one shared identifier list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedVersionTable {
    identifiers: Vec<String>,
    versions: Vec<VersionValues>,
}

impl NormalizedVersionTable {
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn versions(&self) -> &[VersionValues] {
        &self.versions
    }

    pub fn version_names(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(|v| v.name.as_str())
    }

    /// Position of an identifier in canonical order
    pub fn index_of(&self, identifier: &str) -> Option<usize> {
        self.identifiers.iter().position(|i| i == identifier)
    }

    pub fn get(&self, version: &str, identifier: &str) -> Option<&str> {
        let index = self.index_of(identifier)?;
        self.versions
            .iter()
            .find(|v| v.name == version)
            .map(|v| v.values[index].as_str())
    }

    /// `(identifier, value)` pairs of one version in canonical order
    pub fn entries<'a>(
        &'a self,
        version: &str,
    ) -> Option<impl Iterator<Item = (&'a str, &'a str)>> {
        let row = self.versions.iter().find(|v| v.name == version)?;
        Some(
            self.identifiers
                .iter()
                .zip(row.values.iter())
                .map(|(i, v)| (i.as_str(), v.as_str())),
        )
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Validates versions against the default version and normalizes their keys
pub struct Reconciler<'a> {
    normalizer: &'a KeyNormalizer,
}

impl<'a> Reconciler<'a> {
    pub fn new(normalizer: &'a KeyNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn reconcile(
        &self,
        versions: &[(String, RawVersionSource)],
        default_version: &str,
    ) -> Result<(CanonicalKeySet, NormalizedVersionTable)> {
        let default_source = versions
            .iter()
            .find(|(name, _)| name == default_version)
            .map(|(_, source)| source)
            .ok_or_else(|| ResourceError::InvalidVersion {
                version: default_version.to_string(),
                reason: "default version is not defined".to_string(),
            })?;

        let (keys, aligned) = match default_source {
            RawVersionSource::Grouped(tables) => {
                let keys = canonical_tables(tables);
                let aligned = versions
                    .iter()
                    .map(|(name, source)| align_grouped(name, source, &keys))
                    .collect::<Result<Vec<_>>>()?;
                (CanonicalKeySet::Grouped(keys), aligned)
            }
            flat => {
                let keys = canonical_flat(flat);
                let aligned = versions
                    .iter()
                    .map(|(name, source)| align_flat(name, source, &keys))
                    .collect::<Result<Vec<_>>>()?;
                (CanonicalKeySet::Flat(keys), aligned)
            }
        };

        let identifiers = self.identifiers(&keys)?;
        debug!(
            versions = aligned.len(),
            keys = identifiers.len(),
            default = default_version,
            "reconciled versions"
        );

        Ok((
            keys,
            NormalizedVersionTable {
                identifiers,
                versions: aligned,
            },
        ))
    }

    fn identifiers(&self, keys: &CanonicalKeySet) -> Result<Vec<String>> {
        let mut registry = IdentifierRegistry::new();
        let mut identifiers = Vec::with_capacity(keys.len());
        match keys {
            CanonicalKeySet::Flat(raw) => {
                for key in raw {
                    let identifier = self.normalizer.normalize(key);
                    registry.claim(&identifier, key)?;
                    identifiers.push(identifier);
                }
            }
            CanonicalKeySet::Grouped(tables) => {
                for table in tables {
                    for field in &table.fields {
                        let identifier = self.normalizer.normalize_grouped(&table.name, field);
                        registry.claim(&identifier, &grouped_label(&table.name, field))?;
                        identifiers.push(identifier);
                    }
                }
            }
        }
        Ok(identifiers)
    }
}

fn grouped_label(table: &str, field: &str) -> String {
    format!("{}.{}", table, field)
}

/// Keys of a flat default version. A list names its keys by its own elements.
fn canonical_flat(source: &RawVersionSource) -> Vec<String> {
    match source {
        RawVersionSource::Literal(records) | RawVersionSource::Keyed(records) => {
            records.iter().map(|(k, _)| k.clone()).collect()
        }
        RawVersionSource::List(list) => list.clone(),
        RawVersionSource::Grouped(_) => Vec::new(),
    }
}

fn canonical_tables(tables: &[(String, Records)]) -> Vec<CanonicalTable> {
    tables
        .iter()
        .map(|(name, fields)| CanonicalTable {
            name: name.clone(),
            fields: fields.iter().map(|(k, _)| k.clone()).collect(),
        })
        .collect()
}

fn align_flat(version: &str, source: &RawVersionSource, keys: &[String]) -> Result<VersionValues> {
    let values = match source {
        RawVersionSource::Literal(records) | RawVersionSource::Keyed(records) => {
            align_records(version, records, keys, |key| key.to_string())?
        }
        RawVersionSource::List(list) => align_positional(version, list, keys)?,
        RawVersionSource::Grouped(_) => {
            return Err(ResourceError::InvalidVersion {
                version: version.to_string(),
                reason: "grouped tables given where the default version is flat".to_string(),
            })
        }
    };
    Ok(VersionValues {
        name: version.to_string(),
        values,
    })
}

fn align_grouped(
    version: &str,
    source: &RawVersionSource,
    tables: &[CanonicalTable],
) -> Result<VersionValues> {
    let RawVersionSource::Grouped(version_tables) = source else {
        return Err(ResourceError::InvalidVersion {
            version: version.to_string(),
            reason: "flat data given where the default version is grouped".to_string(),
        });
    };

    // Outer pass: table names
    let table_names: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();
    let by_table = consume_keys(
        version,
        version_tables.iter().map(|(name, fields)| (name.as_str(), fields)),
        &table_names,
        |table| table.to_string(),
    )?;

    // Inner pass: fields of each table
    let mut values = Vec::new();
    for (table, fields) in tables.iter().zip(by_table) {
        values.extend(align_records(version, fields, &table.fields, |field| {
            grouped_label(&table.name, field)
        })?);
    }
    Ok(VersionValues {
        name: version.to_string(),
        values,
    })
}

fn align_records(
    version: &str,
    records: &Records,
    keys: &[String],
    label: impl Fn(&str) -> String,
) -> Result<Vec<String>> {
    let consumed = consume_keys(
        version,
        records.iter().map(|(k, v)| (k.as_str(), v)),
        keys,
        label,
    )?;
    Ok(consumed.into_iter().cloned().collect())
}

/// Take every canonical key out of a working copy of `entries`, in canonical
/// order; anything left over is undefined.
fn consume_keys<'e, T>(
    version: &str,
    entries: impl Iterator<Item = (&'e str, &'e T)>,
    keys: &[String],
    label: impl Fn(&str) -> String,
) -> Result<Vec<&'e T>> {
    let entries: Vec<(&str, &T)> = entries.collect();
    let mut working: HashMap<&str, &T> = entries.iter().copied().collect();

    let mut consumed = Vec::with_capacity(keys.len());
    for key in keys {
        let value = working
            .remove(key.as_str())
            .ok_or_else(|| ResourceError::MissingKeyInVersion {
                version: version.to_string(),
                key: label(key),
            })?;
        consumed.push(value);
    }

    if !working.is_empty() {
        let extra = entries
            .iter()
            .filter(|(k, _)| working.contains_key(*k))
            .map(|(k, _)| label(*k))
            .collect();
        return Err(ResourceError::UndefinedKeysFound {
            version: version.to_string(),
            keys: extra,
        });
    }
    Ok(consumed)
}

/// Element `i` of a list belongs to canonical key `i`
fn align_positional(version: &str, list: &[String], keys: &[String]) -> Result<Vec<String>> {
    if let Some(missing) = keys.get(list.len()) {
        return Err(ResourceError::MissingKeyInVersion {
            version: version.to_string(),
            key: missing.clone(),
        });
    }
    if list.len() > keys.len() {
        return Err(ResourceError::UndefinedKeysFound {
            version: version.to_string(),
            keys: (keys.len()..list.len()).map(|i| format!("[{}]", i)).collect(),
        });
    }
    Ok(list.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::config::NamingConfig;
    use crate::error::ErrorKind;

    fn records(pairs: &[(&str, &str)]) -> Records {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn literal(pairs: &[(&str, &str)]) -> RawVersionSource {
        RawVersionSource::Literal(records(pairs))
    }

    fn reconcile(
        versions: Vec<(&str, RawVersionSource)>,
        default_version: &str,
    ) -> Result<(CanonicalKeySet, NormalizedVersionTable)> {
        let normalizer = KeyNormalizer::new(NamingConfig::default());
        let versions: Vec<(String, RawVersionSource)> =
            versions.into_iter().map(|(n, s)| (n.to_string(), s)).collect();
        Reconciler::new(&normalizer).reconcile(&versions, default_version)
    }

    #[test]
    fn test_symmetric_versions() {
        let (keys, table) = reconcile(
            vec![
                ("en", literal(&[("greeting", "Hello"), ("full-name", "Name")])),
                ("de", literal(&[("full-name", "Name (de)"), ("greeting", "Hallo")])),
            ],
            "en",
        )
        .unwrap();

        let expected = vec!["greeting".to_string(), "full-name".to_string()];
        assert_eq!(keys, CanonicalKeySet::Flat(expected));
        assert_eq!(table.identifiers(), ["GREETING", "FULL_NAME"]);
        assert_eq!(table.get("de", "GREETING"), Some("Hallo"));
        assert_eq!(table.get("de", "FULL_NAME"), Some("Name (de)"));
        assert_eq!(table.get("fr", "GREETING"), None);
    }

    #[test]
    fn test_order_follows_default_version() {
        let (_, table) = reconcile(
            vec![
                ("de", literal(&[("a", "1"), ("b", "2"), ("c", "3")])),
                ("en", literal(&[("c", "3"), ("a", "1"), ("b", "2")])),
            ],
            "en",
        )
        .unwrap();
        assert_eq!(table.identifiers(), ["C", "A", "B"]);
        assert_eq!(table.versions()[0].values, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_missing_key() {
        let err = reconcile(
            vec![
                ("en", literal(&[("a", "1"), ("b", "2")])),
                ("de", literal(&[("a", "9")])),
            ],
            "en",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingKeyInVersion);
        assert_eq!(err.version(), Some("de"));
        assert_eq!(err.key(), Some("b"));
    }

    #[test]
    fn test_extra_keys() {
        let err = reconcile(
            vec![
                ("en", literal(&[("a", "1")])),
                ("de", literal(&[("a", "9"), ("b", "2")])),
            ],
            "en",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedKeysFound);
        assert_eq!(err.version(), Some("de"));
        assert_eq!(err.keys(), ["b".to_string()]);
    }

    #[test]
    fn test_first_failing_version_reported() {
        let err = reconcile(
            vec![
                ("en", literal(&[("a", "1"), ("b", "2")])),
                ("de", literal(&[("a", "1"), ("b", "2"), ("x", "3")])),
                ("cs", literal(&[("a", "1")])),
            ],
            "en",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedKeysFound);
        assert_eq!(err.version(), Some("de"));
    }

    #[test]
    fn test_positional_list_versions() {
        let (keys, table) = reconcile(
            vec![
                ("en", RawVersionSource::List(vec!["red".to_string(), "dark-blue".to_string()])),
                ("de", RawVersionSource::List(vec!["rot".to_string(), "dunkelblau".to_string()])),
            ],
            "en",
        )
        .unwrap();
        assert_eq!(keys.raw_keys(), vec!["red", "dark-blue"]);
        assert_eq!(table.identifiers(), ["RED", "DARK_BLUE"]);
        assert_eq!(table.get("de", "DARK_BLUE"), Some("dunkelblau"));
    }

    #[test]
    fn test_positional_list_length_mismatch() {
        let default = RawVersionSource::List(vec!["a".to_string(), "b".to_string()]);

        let err = reconcile(
            vec![("en", default.clone()), ("de", RawVersionSource::List(vec!["x".to_string()]))],
            "en",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingKeyInVersion);
        assert_eq!(err.key(), Some("b"));

        let err = reconcile(
            vec![
                ("en", default),
                ("de", RawVersionSource::List(vec!["x".into(), "y".into(), "z".into()])),
            ],
            "en",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedKeysFound);
        assert_eq!(err.keys(), ["[2]".to_string()]);
    }

    #[test]
    fn test_grouped_reconciliation() {
        let en = RawVersionSource::Grouped(vec![
            ("user".to_string(), records(&[("first_name", "First name"), ("age", "Age")])),
            ("page".to_string(), records(&[("title", "Title")])),
        ]);
        let cs = RawVersionSource::Grouped(vec![
            ("page".to_string(), records(&[("title", "Titulek")])),
            ("user".to_string(), records(&[("age", "Věk"), ("first_name", "Jméno")])),
        ]);
        let (keys, table) = reconcile(vec![("en", en), ("cs", cs)], "en").unwrap();

        assert!(keys.is_grouped());
        assert_eq!(keys.raw_keys(), vec!["user.first_name", "user.age", "page.title"]);
        assert_eq!(table.identifiers(), ["USER_FIRST_NAME", "USER_AGE", "PAGE_TITLE"]);
        assert_eq!(table.get("cs", "USER_FIRST_NAME"), Some("Jméno"));
    }

    #[test]
    fn test_grouped_missing_table_and_field() {
        let en = RawVersionSource::Grouped(vec![
            ("user".to_string(), records(&[("first_name", "First name")])),
            ("page".to_string(), records(&[("title", "Title")])),
        ]);

        let missing_table = RawVersionSource::Grouped(vec![
            ("user".to_string(), records(&[("first_name", "Jméno")])),
        ]);
        let err = reconcile(vec![("en", en.clone()), ("cs", missing_table)], "en").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingKeyInVersion);
        assert_eq!(err.key(), Some("page"));

        let extra_field = RawVersionSource::Grouped(vec![
            ("user".to_string(), records(&[("first_name", "Jméno"), ("nick", "Přezdívka")])),
            ("page".to_string(), records(&[("title", "Titulek")])),
        ]);
        let err = reconcile(vec![("en", en.clone()), ("cs", extra_field)], "en").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedKeysFound);
        assert_eq!(err.keys(), ["user.nick".to_string()]);

        let extra_table = RawVersionSource::Grouped(vec![
            ("user".to_string(), records(&[("first_name", "Jméno")])),
            ("page".to_string(), records(&[("title", "Titulek")])),
            ("footer".to_string(), records(&[("text", "Pata")])),
        ]);
        let err = reconcile(vec![("en", en), ("cs", extra_table)], "en").unwrap_err();
        assert_eq!(err.keys(), ["footer".to_string()]);
    }

    #[test]
    fn test_shape_mismatch() {
        let en = RawVersionSource::Grouped(vec![("user".to_string(), records(&[("a", "1")]))]);
        let err = reconcile(vec![("en", en), ("de", literal(&[("a", "1")]))], "en").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_identifier_collision() {
        let err = reconcile(
            vec![("en", literal(&[("full-name", "A"), ("full_name", "B")]))],
            "en",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateIdentifier);
    }

    #[test]
    fn test_entries_round_trip() {
        let (_, table) = reconcile(
            vec![
                ("en", literal(&[("a", "1"), ("b", "2")])),
                ("de", literal(&[("b", "20"), ("a", "10")])),
            ],
            "en",
        )
        .unwrap();
        let de: Vec<(&str, &str)> = table.entries("de").unwrap().collect();
        assert_eq!(de, vec![("A", "10"), ("B", "20")]);
        assert!(table.entries("fr").is_none());
    }
}
