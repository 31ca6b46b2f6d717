//! Tabular Data Reader
//!
//! Reads the line-oriented tables that back `csv`, `csv-named` and
//! `csv-grouped` resources: one record per line, a single field separator,
//! blank lines and `#` comment lines skipped.
//!
//! Line numbers in errors start at 1 and count skipped lines.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::codegen::config::{ListMode, NamingConfig};
use crate::error::{ResourceError, Result};

/// Ordered key/value records of a keyed table
pub type Records = Vec<(String, String)>;

/// How a tabular file is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// One scalar per line
    List,
    /// `key<sep>value` per line
    KeyedTable,
}

/// Parsed content of one tabular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabularData {
    List(Vec<String>),
    Keyed(Records),
}

/// Reader for separator-delimited resource tables
#[derive(Debug, Clone, Copy)]
pub struct TabularReader {
    separator: char,
    list_mode: ListMode,
}

impl Default for TabularReader {
    fn default() -> Self {
        Self::new(&NamingConfig::default())
    }
}

impl TabularReader {
    pub fn new(config: &NamingConfig) -> Self {
        Self {
            separator: config.separator,
            list_mode: config.list_mode,
        }
    }

    /// Read `path` in the given mode
    pub fn read(&self, path: &Path, mode: ReadMode) -> Result<TabularData> {
        match mode {
            ReadMode::List => self.read_list(path).map(TabularData::List),
            ReadMode::KeyedTable => self.read_keyed(path).map(TabularData::Keyed),
        }
    }

    pub fn read_list(&self, path: &Path) -> Result<Vec<String>> {
        let content = read_file(path)?;
        let list = self.parse_list(path, &content)?;
        debug!(file = %path.display(), entries = list.len(), "read list table");
        Ok(list)
    }

    pub fn read_keyed(&self, path: &Path) -> Result<Records> {
        let content = read_file(path)?;
        let records = self.parse_keyed(path, &content)?;
        debug!(file = %path.display(), entries = records.len(), "read keyed table");
        Ok(records)
    }

    /// Parse list-mode content. `path` is only used for error reporting.
    pub fn parse_list(&self, path: &Path, content: &str) -> Result<Vec<String>> {
        let mut list = Vec::new();
        for (line_number, line) in data_lines(content) {
            let trimmed = line.trim();
            let element = match self.list_mode {
                ListMode::WholeLine => trimmed,
                ListMode::FirstField => match trimmed.split_once(self.separator) {
                    Some((first, _)) => first.trim_end(),
                    None => trimmed,
                },
            };
            if element.is_empty() {
                return Err(malformed(path, line_number));
            }
            list.push(element.to_string());
        }
        Ok(list)
    }

    /// Parse keyed-table content. `path` is only used for error reporting.
    ///
    /// Duplicate keys keep their first position and take the last value.
    pub fn parse_keyed(&self, path: &Path, content: &str) -> Result<Records> {
        let mut records: Records = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (line_number, line) in data_lines(content) {
            let (key, value) = line
                .split_once(self.separator)
                .ok_or_else(|| malformed(path, line_number))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed(path, line_number));
            }

            match positions.get(key) {
                Some(&index) => {
                    warn!(
                        file = %path.display(),
                        line = line_number,
                        key,
                        "duplicate key, last value wins"
                    );
                    records[index].1 = value.to_string();
                }
                None => {
                    positions.insert(key.to_string(), records.len());
                    records.push((key.to_string(), value.to_string()));
                }
            }
        }
        Ok(records)
    }
}

/// Non-skipped lines with their 1-based line numbers, terminators stripped
fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ResourceError::io(path, e))
}

fn malformed(path: &Path, line: usize) -> ResourceError {
    ResourceError::MalformedRow {
        file: path.to_path_buf(),
        line,
    }
}
