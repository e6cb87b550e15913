//! Strategy routing.
//!
//! [`StrategyRouter::route`] turns a request into a [`Strategy`]: a primary
//! method, a confidence, a rationale and an ordered fallback chain.
//!
//! # Decision order
//!
//! 1. **Forced method.** The request names a method: confidence 1.0, empty
//!    chain, nothing else runs.
//! 2. **No classifier** (absent or unavailable): the configured default
//!    method at medium confidence, rationale prefixed `[Degraded]`.
//! 3. **Classifier decision**, served from the [`DecisionCache`] when a
//!    request of the same shape was classified recently.
//! 4. **Classifier error**: the configured safe default at zero
//!    confidence, quality `failed`, empty chain.
//!
//! Fallback chains come from the classifier's alternatives or, failing
//! that, from `fallback_order`; either way they are restricted to methods
//! that have a registered backend. With fallback disabled every chain is
//! empty.

pub mod latency;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

pub use latency::{LatencyTable, MethodLatencyStats};

use crate::backends::{Classifier, ClassifierDecision};
use crate::Result;
use crate::cache::DecisionCache;
use crate::types::{GenerationMethod, GenerationRequest, QualityEstimate, Strategy};

/// Confidence of the strategy used when no classifier can be consulted.
pub const DEGRADED_CONFIDENCE: f64 = 0.5;

/// Router settings.
///
/// Used by both the builder and the TOML config:
///
/// ```toml
/// [routing]
/// default_method = "svg_template"
/// safe_default = "mermaid"
/// fallback_order = ["svg_template", "mermaid", "python_chart"]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Method used when no classifier is available.
    pub default_method: GenerationMethod,
    /// Method used when the classifier errors.
    pub safe_default: GenerationMethod,
    /// Fallback order used when the classifier gives no alternatives.
    pub fallback_order: Vec<GenerationMethod>,
    /// Set from `[dispatch] enable_fallback`.
    #[serde(skip)]
    pub enable_fallback: bool,
    #[serde(rename = "decision_cache_ttl_secs", with = "secs")]
    pub decision_cache_ttl: Duration,
    pub decision_cache_max_entries: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_method: GenerationMethod::SvgTemplate,
            safe_default: GenerationMethod::Mermaid,
            fallback_order: vec![
                GenerationMethod::SvgTemplate,
                GenerationMethod::Mermaid,
                GenerationMethod::PythonChart,
            ],
            enable_fallback: true,
            decision_cache_ttl: Duration::from_secs(300),
            decision_cache_max_entries: 1000,
        }
    }
}

impl RoutingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_method(mut self, method: GenerationMethod) -> Self {
        self.default_method = method;
        self
    }

    pub fn safe_default(mut self, method: GenerationMethod) -> Self {
        self.safe_default = method;
        self
    }

    pub fn fallback_order(mut self, order: Vec<GenerationMethod>) -> Self {
        self.fallback_order = order;
        self
    }

    pub fn enable_fallback(mut self, enabled: bool) -> Self {
        self.enable_fallback = enabled;
        self
    }

    pub fn decision_cache_ttl(mut self, ttl: Duration) -> Self {
        self.decision_cache_ttl = ttl;
        self
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Produces a fresh [`Strategy`] per request. See module docs.
pub struct StrategyRouter {
    config: RoutingConfig,
    classifier: Option<Arc<dyn Classifier>>,
    decisions: DecisionCache,
    registered: Vec<GenerationMethod>,
    latency: Arc<LatencyTable>,
}

impl StrategyRouter {
    /// `registered` lists the methods that have a backend; fallback chains
    /// never name anything else.
    pub fn new(
        config: RoutingConfig,
        classifier: Option<Arc<dyn Classifier>>,
        registered: Vec<GenerationMethod>,
        latency: Arc<LatencyTable>,
    ) -> Self {
        let decisions =
            DecisionCache::new(config.decision_cache_max_entries, config.decision_cache_ttl);
        Self {
            config,
            classifier,
            decisions,
            registered,
            latency,
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub async fn route(&self, request: &GenerationRequest) -> Strategy {
        let strategy = self.decide(request).await;
        debug!(
            diagram_type = request.diagram_type(),
            method = %strategy.method,
            confidence = strategy.confidence,
            fallbacks = ?strategy.fallback_chain,
            rationale = %strategy.rationale,
            "routed request"
        );
        strategy
    }

    async fn decide(&self, request: &GenerationRequest) -> Strategy {
        if let Some(method) = request.forced_method() {
            return self.estimated(Strategy::new(
                method,
                1.0,
                format!("Method {method} forced by request"),
            ));
        }

        let classifier = match &self.classifier {
            Some(c) if c.is_available() => c,
            _ => return self.degraded(),
        };

        if let Some(decision) = self.decisions.get(request).await {
            return self.from_decision(decision);
        }

        match classifier.classify(request).await {
            Ok(decision) => {
                self.decisions.insert(request, decision.clone()).await;
                self.from_decision(decision)
            }
            Err(e) => {
                warn!(
                    classifier = classifier.name(),
                    diagram_type = request.diagram_type(),
                    error = %e,
                    "classifier failed, using safe default"
                );
                self.estimated(
                    Strategy::new(
                        self.config.safe_default,
                        0.0,
                        format!("Classifier error ({e}); using safe default"),
                    )
                    .with_quality_estimate(QualityEstimate::Failed),
                )
            }
        }
    }

    fn degraded(&self) -> Strategy {
        let method = self.config.default_method;
        let strategy = Strategy::new(
            method,
            DEGRADED_CONFIDENCE,
            format!("[Degraded] classifier unavailable; using default method {method}"),
        )
        .with_fallbacks(self.fallbacks(&self.config.fallback_order));
        self.estimated(strategy)
    }

    fn from_decision(&self, decision: ClassifierDecision) -> Strategy {
        let order = if decision.alternatives.is_empty() {
            &self.config.fallback_order
        } else {
            &decision.alternatives
        };
        let strategy = Strategy::new(decision.method, decision.confidence, decision.rationale)
            .with_fallbacks(self.fallbacks(order));
        self.estimated(strategy)
    }

    fn fallbacks(&self, order: &[GenerationMethod]) -> Vec<GenerationMethod> {
        if !self.config.enable_fallback {
            return Vec::new();
        }
        order
            .iter()
            .copied()
            .filter(|m| self.registered.contains(m))
            .collect()
    }

    /// Promote the next method of `strategy`'s chain, with its estimate
    /// refreshed from observed latency.
    ///
    /// Returns [`RunesmithError::NoFallback`](crate::RunesmithError::NoFallback)
    /// when the chain is empty.
    pub fn fallback(&self, strategy: &Strategy) -> Result<Strategy> {
        strategy.use_fallback().map(|next| self.estimated(next))
    }

    fn estimated(&self, strategy: Strategy) -> Strategy {
        let duration = self.latency.estimate(strategy.method);
        strategy.with_estimated_duration(duration)
    }

    /// Forget all cached classifier decisions.
    pub fn clear_decisions(&self) {
        self.decisions.clear();
    }
}
