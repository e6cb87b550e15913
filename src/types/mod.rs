//! Public types for the Runesmith API.

mod job;
mod method;
mod request;
mod result;
mod strategy;

pub use job::{Job, JobId, JobStatus};
pub use method::GenerationMethod;
pub use request::{
    ColorScheme, DataPoint, DiagramConstraints, DiagramTheme, GenerationRequest,
    GenerationRequestBuilder, normalize_diagram_type,
};
pub use result::{ContentDelivery, GenerationMetadata, GenerationResult};
pub use strategy::{FALLBACK_CONFIDENCE, QualityEstimate, Strategy};
