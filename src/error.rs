//! Runesmith error types

use std::time::Duration;

use crate::types::{GenerationMethod, JobId};

/// Runesmith error types
#[derive(Debug, thiserror::Error)]
pub enum RunesmithError {
    // Per-attempt failures (recovered by the fallback loop)
    /// Backend declined the diagram type. The conductor advances to the
    /// next fallback without treating this as a failure of the backend.
    #[error("{method} does not support diagram type '{diagram_type}'")]
    UnsupportedDiagramType {
        method: GenerationMethod,
        diagram_type: String,
    },

    #[error("{method} timed out after {timeout:?}")]
    BackendTimeout {
        method: GenerationMethod,
        timeout: Duration,
    },

    /// Backend returned an error, or panicked.
    #[error("{method} failed: {message}")]
    Backend {
        method: GenerationMethod,
        message: String,
    },

    // Terminal dispatch outcome
    /// Every method in the strategy chain failed or declined.
    #[error("all generation methods failed ({attempts} attempted)")]
    AllMethodsExhausted { attempts: usize },

    #[error("no backend registered for {0}")]
    NoBackend(GenerationMethod),

    #[error("no fallback methods available")]
    NoFallback,

    // Routing
    #[error("classifier error: {0}")]
    Classifier(String),

    // Side collaborators (never fatal to a successful generation)
    #[error("storage upload failed: {0}")]
    StorageUpload(String),

    #[error("cache error: {0}")]
    Cache(String),

    // Input / lookup
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for Runesmith operations
pub type Result<T> = std::result::Result<T, RunesmithError>;
