//! Error types for resource compilation

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for resource compilation
pub type Result<T> = std::result::Result<T, ResourceError>;

/// Resource compilation errors.
///
/// None of these are retried: each one terminates the compilation of the
/// definition it was raised for.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Invalid definition {}: {message}", .file.display())]
    Configuration { file: PathBuf, message: String },

    #[error("{line}. line in {} has bad format.", .file.display())]
    MalformedRow { file: PathBuf, line: usize },

    #[error("Value key ({key}) missing in version: {version}")]
    MissingKeyInVersion { version: String, key: String },

    #[error("Keys found in version ({version}) that were not defined in default version: {}", .keys.join(","))]
    UndefinedKeysFound { version: String, keys: Vec<String> },

    #[error("Invalid version {version}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Identifier {identifier} is produced by both '{first}' and '{second}'")]
    DuplicateIdentifier {
        identifier: String,
        first: String,
        second: String,
    },

    #[error("Cannot decode {}: {message}", .file.display())]
    Decode { file: PathBuf, message: String },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of a [`ResourceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    MalformedRow,
    MissingKeyInVersion,
    UndefinedKeysFound,
    DuplicateIdentifier,
    Decode,
    Io,
}

impl ResourceError {
    pub fn configuration(file: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Configuration {
            file: file.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } | Self::InvalidVersion { .. } => ErrorKind::Configuration,
            Self::MalformedRow { .. } => ErrorKind::MalformedRow,
            Self::MissingKeyInVersion { .. } => ErrorKind::MissingKeyInVersion,
            Self::UndefinedKeysFound { .. } => ErrorKind::UndefinedKeysFound,
            Self::DuplicateIdentifier { .. } => ErrorKind::DuplicateIdentifier,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Version the error was raised for, if it is a reconciliation failure
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::MissingKeyInVersion { version, .. }
            | Self::UndefinedKeysFound { version, .. }
            | Self::InvalidVersion { version, .. } => Some(version),
            _ => None,
        }
    }

    /// Missing key of a [`ResourceError::MissingKeyInVersion`]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::MissingKeyInVersion { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Extra keys of a [`ResourceError::UndefinedKeysFound`]
    pub fn keys(&self) -> &[String] {
        match self {
            Self::UndefinedKeysFound { keys, .. } => keys,
            _ => &[],
        }
    }
}
