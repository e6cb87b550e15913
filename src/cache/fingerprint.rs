//! Deterministic request fingerprints.
//!
//! A fingerprint is a SHA-256 over the JSON encoding of the fields that
//! affect output: normalized diagram type, content, theme and
//! constraints. Session, user, correlation id, timestamp and forced
//! method are left out so that requests differing only in
//! those fields share a cache entry.
//!
//! Collisions are accepted; entries are never compared field-by-field.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::{DiagramConstraints, DiagramTheme, GenerationRequest};
use crate::{Result, RunesmithError};

/// Hex-encoded SHA-256 cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a request.
    ///
    /// Only fails, with [`RunesmithError::Cache`], if the key fields cannot
    /// be serialized.
    pub fn of(request: &GenerationRequest) -> Result<Self> {
        let key = FingerprintKey {
            diagram_type: request.diagram_type(),
            content: request.content(),
            theme: request.theme(),
            constraints: request.constraints(),
        };
        let bytes = serde_json::to_vec(&key)
            .map_err(|e| RunesmithError::Cache(format!("cannot fingerprint request: {e}")))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct FingerprintKey<'a> {
    diagram_type: &'a str,
    content: &'a str,
    theme: &'a DiagramTheme,
    constraints: &'a DiagramConstraints,
}
