//! Runesmith - diagram generation orchestrator
//!
//! This crate sits between callers asking for diagrams and the backends
//! that render them (SVG templates, LLM-written Mermaid, programmatic
//! charts). For each request it picks a strategy, dispatches to backends
//! under a deadline with ordered fallback, caches results by request
//! fingerprint, and tracks an asynchronous job the caller can poll.
//!
//! Backends, classifiers and artifact stores are supplied by the host
//! through the traits in [`backends`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use runesmith::{
//!     Backend, GenerationMethod, GenerationRequest, GenerationResult, JobStatus, Runesmith,
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Backend for Echo {
//!     fn method(&self) -> GenerationMethod {
//!         GenerationMethod::Mermaid
//!     }
//!
//!     async fn generate(&self, request: &GenerationRequest) -> runesmith::Result<GenerationResult> {
//!         Ok(GenerationResult::new(request.content(), "mermaid"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> runesmith::Result<()> {
//!     let service = Runesmith::builder()
//!         .backend(Arc::new(Echo))
//!         .rule_classifier()
//!         .build()?;
//!     service.start();
//!
//!     let job = service.submit(GenerationRequest::new("A --> B", "workflow")?);
//!     loop {
//!         let snapshot = service.poll_status(job)?;
//!         if snapshot.status == JobStatus::Completed {
//!             println!("{}", snapshot.result.unwrap().content);
//!             break;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!     }
//!
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod backends;
pub mod cache;
pub mod conductor;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod routing;
pub mod service;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use error::{Result, RunesmithError};
pub use service::{DiagramService, Runesmith, RunesmithBuilder};

pub use backends::{
    ArtifactStore, Backend, BackendRegistry, Classifier, ClassifierDecision, RuleClassifier,
    UploadContext,
};
pub use cache::{CacheConfig, CacheStats, Fingerprint, ResultCache};
pub use conductor::{AttemptOutcome, Conductor, ConductorStats};
pub use config::{Config, LoggingConfig};
pub use jobs::{JobLedger, JobStats};
pub use logging::init_tracing;
pub use routing::{RoutingConfig, StrategyRouter};

// Re-export all types
pub use types::{
    ColorScheme, ContentDelivery, DataPoint, DiagramConstraints, DiagramTheme,
    GenerationMetadata, GenerationMethod, GenerationRequest, GenerationRequestBuilder,
    GenerationResult, Job, JobId, JobStatus, QualityEstimate, Strategy,
};
