//! Builder for configuring service instances

use std::sync::Arc;
use std::time::Duration;

use super::{DiagramService, MaintenanceSchedule};
use crate::backends::{ArtifactStore, Backend, BackendRegistry, Classifier, RuleClassifier};
use crate::cache::{CacheConfig, ResultCache};
use crate::conductor::Conductor;
use crate::config::Config;
use crate::jobs::JobLedger;
use crate::routing::{LatencyTable, StrategyRouter};
use crate::{Result, RunesmithError};

/// Main entry point for creating service instances.
pub struct Runesmith;

impl Runesmith {
    /// Create a new builder for configuring the service.
    pub fn builder() -> RunesmithBuilder {
        RunesmithBuilder::new()
    }
}

/// Builder for configuring service instances.
///
/// ```rust,ignore
/// let service = Runesmith::builder()
///     .config(Config::load(None)?)
///     .backend(Arc::new(SvgTemplates::new()))
///     .backend(Arc::new(MermaidGenerator::new(llm)))
///     .rule_classifier()
///     .build()?;
/// service.start();
/// ```
#[derive(Default)]
pub struct RunesmithBuilder {
    config: Config,
    backends: Vec<Arc<dyn Backend>>,
    classifier: Option<Arc<dyn Classifier>>,
    artifact_store: Option<Arc<dyn ArtifactStore>>,
    cache_config: Option<CacheConfig>,
    request_timeout: Option<Duration>,
}

impl RunesmithBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a loaded configuration. Later builder calls override it.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Register a generation backend under its method.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Route with a custom classifier.
    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Route with the built-in [`RuleClassifier`].
    pub fn rule_classifier(self) -> Self {
        self.classifier(Arc::new(RuleClassifier::new()))
    }

    /// Upload finished artifacts to `store`.
    pub fn artifact_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.artifact_store = Some(store);
        self
    }

    /// Override the `[cache]` section.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache_config = Some(config);
        self
    }

    /// Turn the result cache on or off.
    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.config.dispatch.enable_cache = enabled;
        self
    }

    /// Turn fallback chains on or off.
    pub fn enable_fallback(mut self, enabled: bool) -> Self {
        self.config.dispatch.enable_fallback = enabled;
        self
    }

    /// Override the per-attempt deadline.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the service. Requires at least one backend.
    pub fn build(self) -> Result<DiagramService> {
        self.config.validate()?;
        if self.backends.is_empty() {
            return Err(RunesmithError::Configuration(
                "at least one backend must be registered".to_string(),
            ));
        }
        let request_timeout = self
            .request_timeout
            .unwrap_or_else(|| self.config.dispatch.request_timeout());
        if request_timeout.is_zero() {
            return Err(RunesmithError::Configuration(
                "request timeout must be positive".to_string(),
            ));
        }

        let mut registry = BackendRegistry::new();
        for backend in self.backends {
            registry.register(backend);
        }
        let registry = Arc::new(registry);

        let latency = Arc::new(LatencyTable::new());
        let mut routing = self.config.routing.clone();
        routing.enable_fallback = self.config.dispatch.enable_fallback;
        let router = Arc::new(StrategyRouter::new(
            routing,
            self.classifier,
            registry.methods(),
            Arc::clone(&latency),
        ));

        let cache_config = self
            .cache_config
            .unwrap_or_else(|| CacheConfig::from(&self.config.cache));
        if cache_config.sweep_interval.is_zero() {
            return Err(RunesmithError::Configuration(
                "cache sweep interval must be positive".to_string(),
            ));
        }
        let cache = self
            .config
            .dispatch
            .enable_cache
            .then(|| Arc::new(ResultCache::new(&cache_config)));

        let conductor = Conductor::new(
            registry,
            router,
            cache,
            self.artifact_store,
            latency,
            request_timeout,
        );

        let schedule = MaintenanceSchedule {
            cache_sweep_interval: cache_config.sweep_interval,
            job_sweep_interval: self.config.jobs.sweep_interval(),
            job_retention: self.config.jobs.retention(),
        };
        Ok(DiagramService::new(
            Arc::new(conductor),
            Arc::new(JobLedger::new()),
            schedule,
        ))
    }
}
