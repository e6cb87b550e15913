//! Routing decisions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::GenerationMethod;
use crate::{Result, RunesmithError};

/// Confidence assigned to a strategy promoted from a fallback chain.
pub const FALLBACK_CONFIDENCE: f64 = 0.7;

/// Qualitative expectation for a strategy's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityEstimate {
    High,
    Medium,
    Acceptable,
    /// Routing itself failed; generation proceeds on a safe default.
    Failed,
}

impl QualityEstimate {
    /// Map a confidence score to its band: `>= 0.8` high, `>= 0.5`
    /// medium, otherwise acceptable.
    ///
    /// [`Failed`](Self::Failed) is never produced here; it is assigned
    /// explicitly when the classifier errors.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            QualityEstimate::High
        } else if confidence >= 0.5 {
            QualityEstimate::Medium
        } else {
            QualityEstimate::Acceptable
        }
    }
}

impl fmt::Display for QualityEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QualityEstimate::High => "high",
            QualityEstimate::Medium => "medium",
            QualityEstimate::Acceptable => "acceptable",
            QualityEstimate::Failed => "failed",
        })
    }
}

/// The routing decision for one request: a primary method plus an ordered
/// fallback chain.
///
/// Strategies are values. [`use_fallback`](Self::use_fallback) never
/// mutates; it returns the next strategy in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub method: GenerationMethod,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub rationale: String,
    pub fallback_chain: Vec<GenerationMethod>,
    pub estimated_duration: Duration,
    pub quality_estimate: QualityEstimate,
}

impl Strategy {
    /// Create a strategy with the quality band derived from `confidence`.
    pub fn new(method: GenerationMethod, confidence: f64, rationale: impl Into<String>) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            method,
            confidence,
            rationale: rationale.into(),
            fallback_chain: Vec::new(),
            estimated_duration: method.estimated_duration(),
            quality_estimate: QualityEstimate::from_confidence(confidence),
        }
    }

    /// Set the fallback chain, dropping duplicates and the primary itself.
    pub fn with_fallbacks(mut self, chain: impl IntoIterator<Item = GenerationMethod>) -> Self {
        let mut fallbacks: Vec<GenerationMethod> = Vec::new();
        for method in chain {
            if method != self.method && !fallbacks.contains(&method) {
                fallbacks.push(method);
            }
        }
        self.fallback_chain = fallbacks;
        self
    }

    pub fn with_estimated_duration(mut self, duration: Duration) -> Self {
        self.estimated_duration = duration;
        self
    }

    pub fn with_quality_estimate(mut self, quality: QualityEstimate) -> Self {
        self.quality_estimate = quality;
        self
    }

    /// Whether any fallback remains.
    pub fn has_fallback(&self) -> bool {
        !self.fallback_chain.is_empty()
    }

    /// Next method in the chain, if any.
    pub fn next_method(&self) -> Option<GenerationMethod> {
        self.fallback_chain.first().copied()
    }

    /// Promote the head of the fallback chain to primary.
    ///
    /// Returns [`RunesmithError::NoFallback`] when the chain is empty.
    pub fn use_fallback(&self) -> Result<Strategy> {
        let (&next, rest) = self
            .fallback_chain
            .split_first()
            .ok_or(RunesmithError::NoFallback)?;
        let quality = if next == GenerationMethod::PythonChart {
            QualityEstimate::Acceptable
        } else {
            QualityEstimate::Medium
        };
        Ok(Strategy {
            method: next,
            confidence: FALLBACK_CONFIDENCE,
            rationale: format!("Fallback from {} due to error or unsupported type", self.method),
            fallback_chain: rest.to_vec(),
            estimated_duration: next.estimated_duration(),
            quality_estimate: quality,
        })
    }
}
