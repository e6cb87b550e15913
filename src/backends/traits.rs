//! Collaborator traits consumed by the orchestration core.
//!
//! Backends implement one small capability trait rather than anything
//! method-specific. The conductor treats every backend polymorphically:
//! it asks `supports`, then calls `generate` under a deadline, and never
//! special-cases a method beyond looking it up in the registry.
//!
//! # Fallback semantics
//!
//! - `supports` returning `false` is not a failure. The conductor skips
//!   the backend and advances the chain.
//! - Any error from `generate` advances the chain. Each backend is called at
//!   most once per request.
//! - A panic inside `generate` is caught and counts as a failed attempt.
//!
//! # Example
//!
//! ```ignore
//! struct Templates;
//!
//! #[async_trait]
//! impl Backend for Templates {
//!     fn method(&self) -> GenerationMethod {
//!         GenerationMethod::SvgTemplate
//!     }
//!
//!     async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
//!         let svg = render(request.diagram_type(), request.content())?;
//!         Ok(GenerationResult::new(svg, "svg"))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::Result;
use crate::types::{GenerationMethod, GenerationRequest, GenerationResult};

// ============================================================================
// Backend
// ============================================================================

/// One generation method.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The method this backend is registered under.
    fn method(&self) -> GenerationMethod;

    /// Backend name for logging/debugging.
    fn name(&self) -> &str {
        self.method().as_str()
    }

    /// Whether this backend can render `diagram_type` (already normalized).
    ///
    /// Default: consult the method's static supported-type table.
    async fn supports(&self, diagram_type: &str) -> bool {
        self.method().handles(diagram_type)
    }

    /// Produce an artifact. The returned result's orchestration metadata
    /// is overwritten by the conductor.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;
}

// ============================================================================
// Classifier
// ============================================================================

/// A classifier's ranking of methods for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierDecision {
    pub method: GenerationMethod,
    pub confidence: f64,
    pub rationale: String,
    /// Explicit fallback order. Empty means "use the configured order".
    pub alternatives: Vec<GenerationMethod>,
}

impl ClassifierDecision {
    pub fn new(method: GenerationMethod, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            method,
            confidence,
            rationale: rationale.into(),
            alternatives: Vec::new(),
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<GenerationMethod>) -> Self {
        self.alternatives = alternatives;
        self
    }
}

/// Ranks methods for a request. Optional: the router degrades to a
/// default strategy without one.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classifier name for logging/debugging.
    fn name(&self) -> &str;

    /// Whether the classifier can currently be consulted.
    ///
    /// An unavailable classifier yields a degraded strategy; an available
    /// one that then errors yields the zero-confidence safe default.
    fn is_available(&self) -> bool {
        true
    }

    async fn classify(&self, request: &GenerationRequest) -> Result<ClassifierDecision>;
}

// ============================================================================
// Artifact store
// ============================================================================

/// Context handed to an [`ArtifactStore`] alongside the artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadContext {
    pub diagram_id: String,
    pub diagram_type: String,
    pub method: GenerationMethod,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

/// Persists finished artifacts and returns a retrievable URL.
///
/// Called after a successful generation. A failed upload never fails the
/// generation; the result is delivered inline instead.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store name for logging/debugging.
    fn name(&self) -> &str;

    async fn upload(&self, result: &GenerationResult, context: &UploadContext) -> Result<String>;
}
