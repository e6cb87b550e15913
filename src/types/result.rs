//! Backend output and orchestration metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::GenerationMethod;

/// How the artifact reaches the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentDelivery {
    /// Content is carried in the result itself.
    #[default]
    Inline,
    /// Content was uploaded; see `artifact_url`.
    Url,
}

/// Orchestration-level metadata attached by the conductor.
///
/// Backends leave this at its default; the conductor fills it in before
/// the result is cached or returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Method that actually produced the artifact.
    pub generation_method: Option<GenerationMethod>,
    pub fallback_used: bool,
    /// Quality score in `[0, 1]`.
    pub quality_score: f64,
    pub generation_time_ms: u64,
    pub cache_hit: bool,
    /// Number of backend attempts made for this result.
    pub attempts: usize,
}

/// A generated diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Artifact body (SVG markup, Mermaid source, base64 image, ...).
    pub content: String,
    /// Output type tag, e.g. `"svg"`, `"mermaid"`, `"png"`.
    pub content_type: String,
    /// Free-form metadata reported by the backend.
    #[serde(default)]
    pub backend_metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: GenerationMetadata,
    #[serde(default)]
    pub diagram_id: Option<String>,
    #[serde(default)]
    pub artifact_url: Option<String>,
    #[serde(default)]
    pub content_delivery: ContentDelivery,
}

impl GenerationResult {
    /// Create a result as a backend would return it.
    pub fn new(content: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            backend_metadata: BTreeMap::new(),
            metadata: GenerationMetadata::default(),
            diagram_id: None,
            artifact_url: None,
            content_delivery: ContentDelivery::Inline,
        }
    }

    /// Attach a backend metadata entry.
    pub fn with_backend_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.backend_metadata.insert(key.into(), value.into());
        self
    }
}
