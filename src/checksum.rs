//! Fingerprints stamped into generated files
//!
//! Every generated file carries a `// fingerprint: sha256:<hex>` header line
//! computed over the body below the header. A file whose stamped fingerprint no
//! longer matches its body has been edited by hand.

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header marker preceding the fingerprint
pub const FINGERPRINT_MARKER: &str = "// fingerprint: sha256:";

/// SHA256 fingerprint of generated content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute fingerprint from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute fingerprint of a generated body
    pub fn of(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this fingerprint
    pub fn verify(&self, content: &str) -> bool {
        Self::of(content) == *self
    }

    /// Header line carrying this fingerprint
    pub fn header_line(&self) -> String {
        format!("{}{}", FINGERPRINT_MARKER, self.0)
    }

    /// Split a generated file into its stamped fingerprint and the body that
    /// follows the header block. `None` if the file carries no fingerprint.
    pub fn extract(file: &str) -> Option<(Self, &str)> {
        let start = file.find(FINGERPRINT_MARKER)?;
        let rest = &file[start + FINGERPRINT_MARKER.len()..];
        let line_end = rest.find('\n')?;
        let fingerprint = Self(rest[..line_end].trim().to_string());
        // Header ends at the first blank line after the fingerprint
        let body = rest
            .find("\n\n")
            .map(|i| &rest[i + 2..])
            .unwrap_or("");
        Some((fingerprint, body))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}
