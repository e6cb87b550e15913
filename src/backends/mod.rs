//! Backend, classifier and artifact-store collaborators.
//!
//! This module defines the traits the orchestration core consumes and the
//! plumbing around them:
//!
//! - [`Backend`], [`Classifier`], [`ArtifactStore`]: capability contracts
//! - [`BackendRegistry`]: method → backend map, fixed after build
//! - [`RuleClassifier`]: built-in table-driven classifier

pub mod registry;
pub mod rules;
pub mod traits;

pub use registry::BackendRegistry;
pub use rules::{RuleClassifier, mermaid_type_for};
pub use traits::{ArtifactStore, Backend, Classifier, ClassifierDecision, UploadContext};
