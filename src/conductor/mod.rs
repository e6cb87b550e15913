//! The dispatcher.
//!
//! [`Conductor::generate`] runs one request through
//!
//! ```text
//! CacheCheck ─hit──────────────────────────────────────────► Success
//!     │ miss
//!     ▼
//! RouteSelect ─► Attempt(primary) ─► Attempt(fallback_1) ─► … ─► Exhausted
//!                      │ ok                  │ ok
//!                      ▼                     ▼
//!                   Success               Success
//! ```
//!
//! Each attempt yields an [`AttemptOutcome`]. Anything but `Success`
//! advances the chain via [`StrategyRouter::fallback`]; an empty chain ends
//! the loop with [`RunesmithError::AllMethodsExhausted`]. A request
//! therefore makes at most `fallback_chain.len() + 1` attempts, and only
//! one backend is in flight per request at any time. Each backend call
//! runs on its own task, so a backend that panics fails its attempt like
//! any other error.
//!
//! On success the result's metadata is filled in, the artifact is
//! uploaded if a store is configured, and the result is written to the
//! cache, in that order. Neither upload nor cache failures fail the
//! request.

pub mod quality;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, timeout};
use tracing::{Instrument, debug, info, instrument, warn};
use uuid::Uuid;

use crate::backends::{ArtifactStore, BackendRegistry, UploadContext};
use crate::cache::{Fingerprint, ResultCache};
use crate::routing::{LatencyTable, StrategyRouter};
use crate::telemetry;
use crate::types::{
    ContentDelivery, GenerationMetadata, GenerationMethod, GenerationRequest, GenerationResult,
};
use crate::{Result, RunesmithError};

/// Result of one step of the fallback chain.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success {
        result: GenerationResult,
        elapsed: Duration,
    },
    /// The backend declined the diagram type. Carries
    /// [`RunesmithError::UnsupportedDiagramType`].
    Unsupported(RunesmithError),
    /// The backend did not answer within the request timeout. Carries
    /// [`RunesmithError::BackendTimeout`].
    TimedOut(RunesmithError),
    /// The backend returned an error or panicked, or none is registered.
    Failed(RunesmithError),
}

impl AttemptOutcome {
    fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success { .. } => "ok",
            AttemptOutcome::Unsupported(_) => "unsupported",
            AttemptOutcome::TimedOut(_) => "timeout",
            AttemptOutcome::Failed(_) => "error",
        }
    }

    /// The error behind a non-success outcome.
    pub fn error(&self) -> Option<&RunesmithError> {
        match self {
            AttemptOutcome::Success { .. } => None,
            AttemptOutcome::Unsupported(e)
            | AttemptOutcome::TimedOut(e)
            | AttemptOutcome::Failed(e) => Some(e),
        }
    }
}

/// Snapshot of conductor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConductorStats {
    /// Every call to `generate`, cache hits included.
    pub total_generations: u64,
    /// Successful generations that needed a fallback method.
    pub fallbacks: u64,
    /// Requests that exhausted every method.
    pub errors: u64,
    pub cache_hits: u64,
}

impl ConductorStats {
    pub fn fallback_rate(&self) -> f64 {
        ratio(self.fallbacks, self.total_generations)
    }

    pub fn error_rate(&self) -> f64 {
        ratio(self.errors, self.total_generations)
    }
}

fn ratio(n: u64, d: u64) -> f64 {
    if d == 0 { 0.0 } else { n as f64 / d as f64 }
}

#[derive(Default)]
struct Counters {
    total: AtomicU64,
    fallbacks: AtomicU64,
    errors: AtomicU64,
    cache_hits: AtomicU64,
}

/// Dispatches requests across backends. Shared by all in-flight jobs.
pub struct Conductor {
    registry: Arc<BackendRegistry>,
    router: Arc<StrategyRouter>,
    cache: Option<Arc<ResultCache>>,
    artifact_store: Option<Arc<dyn ArtifactStore>>,
    latency: Arc<LatencyTable>,
    request_timeout: Duration,
    counters: Counters,
}

impl Conductor {
    /// `cache` is `None` when caching is disabled.
    pub fn new(
        registry: Arc<BackendRegistry>,
        router: Arc<StrategyRouter>,
        cache: Option<Arc<ResultCache>>,
        artifact_store: Option<Arc<dyn ArtifactStore>>,
        latency: Arc<LatencyTable>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            router,
            cache,
            artifact_store,
            latency,
            request_timeout,
            counters: Counters::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn cache(&self) -> Option<&Arc<ResultCache>> {
        self.cache.as_ref()
    }

    pub fn router(&self) -> &Arc<StrategyRouter> {
        &self.router
    }

    pub fn latency(&self) -> &Arc<LatencyTable> {
        &self.latency
    }

    /// Generate a diagram, falling back through the routed chain.
    #[instrument(skip_all, fields(diagram_type = %request.diagram_type()))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let start = Instant::now();
        self.counters.total.fetch_add(1, Ordering::Relaxed);

        let fingerprint = self.fingerprint(request);
        if let Some(hit) = self.cached(fingerprint.as_ref(), start) {
            return Ok(hit);
        }

        let mut strategy = self.router.route(request).await;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let method = strategy.method;
            let outcome = self.attempt(method, request).await;
            metrics::counter!(telemetry::ATTEMPTS_TOTAL,
                "method" => method.as_str(),
                "outcome" => outcome.label(),
            )
            .increment(1);

            match outcome {
                AttemptOutcome::Success { result, elapsed } => {
                    self.latency.record(method, elapsed);
                    let metadata = GenerationMetadata {
                        generation_method: Some(method),
                        fallback_used: attempts > 1,
                        quality_score: quality::score(strategy.confidence, result.content.len()),
                        generation_time_ms: start.elapsed().as_millis() as u64,
                        cache_hit: false,
                        attempts,
                    };
                    return Ok(self.finish(request, fingerprint, result, metadata, start).await);
                }
                AttemptOutcome::Unsupported(e) => {
                    info!(%method, reason = %e, "backend skipped");
                }
                AttemptOutcome::TimedOut(e) | AttemptOutcome::Failed(e) => {
                    warn!(%method, error = %e, "backend attempt failed");
                }
            }

            match self.router.fallback(&strategy) {
                Ok(next) => {
                    metrics::counter!(telemetry::FALLBACKS_TOTAL).increment(1);
                    debug!(
                        from = %method,
                        to = %next.method,
                        estimated_ms = next.estimated_duration.as_millis() as u64,
                        "falling back"
                    );
                    strategy = next;
                }
                Err(_) => break,
            }
        }

        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "exhausted").increment(1);
        warn!(attempts, "all generation methods failed");
        Err(RunesmithError::AllMethodsExhausted { attempts })
    }

    /// Run one backend under the request timeout.
    pub async fn attempt(
        &self,
        method: GenerationMethod,
        request: &GenerationRequest,
    ) -> AttemptOutcome {
        let Some(backend) = self.registry.get(method) else {
            return AttemptOutcome::Failed(RunesmithError::NoBackend(method));
        };
        if !backend.supports(request.diagram_type()).await {
            return AttemptOutcome::Unsupported(RunesmithError::UnsupportedDiagramType {
                method,
                diagram_type: request.diagram_type().to_string(),
            });
        }

        let owned = request.clone();
        let started = Instant::now();
        let mut call =
            tokio::spawn(async move { backend.generate(&owned).await }.in_current_span());
        match timeout(self.request_timeout, &mut call).await {
            Ok(Ok(Ok(result))) => AttemptOutcome::Success {
                result,
                elapsed: started.elapsed(),
            },
            Ok(Ok(Err(e))) => AttemptOutcome::Failed(e),
            Ok(Err(e)) => AttemptOutcome::Failed(RunesmithError::Backend {
                method,
                message: if e.is_panic() {
                    "backend panicked".to_string()
                } else {
                    "backend call was cancelled".to_string()
                },
            }),
            Err(_) => {
                call.abort();
                AttemptOutcome::TimedOut(RunesmithError::BackendTimeout {
                    method,
                    timeout: self.request_timeout,
                })
            }
        }
    }

    fn fingerprint(&self, request: &GenerationRequest) -> Option<Fingerprint> {
        self.cache.as_ref()?;
        match Fingerprint::of(request) {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!(error = %e, "request will not be cached");
                None
            }
        }
    }

    fn cached(&self, fingerprint: Option<&Fingerprint>, start: Instant) -> Option<GenerationResult> {
        let (cache, fingerprint) = (self.cache.as_ref()?, fingerprint?);
        let mut hit = cache.get(fingerprint)?;

        hit.metadata.cache_hit = true;
        hit.metadata.quality_score = quality::with_cache_bonus(hit.metadata.quality_score);
        hit.metadata.generation_time_ms = start.elapsed().as_millis() as u64;

        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "cache_hit").increment(1);
        debug!(fingerprint = fingerprint.short(), "served from cache");
        Some(hit)
    }

    async fn finish(
        &self,
        request: &GenerationRequest,
        fingerprint: Option<Fingerprint>,
        mut result: GenerationResult,
        metadata: GenerationMetadata,
        start: Instant,
    ) -> GenerationResult {
        let method = metadata.generation_method;
        let fallback_used = metadata.fallback_used;
        result.metadata = metadata;
        if result.diagram_id.is_none() {
            result.diagram_id = Some(Uuid::new_v4().to_string());
        }

        if let Some(method) = method {
            self.upload(request, method, &mut result).await;
        }

        if let (Some(cache), Some(fp)) = (&self.cache, fingerprint) {
            cache.set(fp, result.clone());
        }

        if fallback_used {
            self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        let method_label = method.map_or("none", |m| m.as_str());
        metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "ok").increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "method" => method_label)
            .record(start.elapsed().as_secs_f64());
        info!(
            method = method_label,
            fallback_used,
            attempts = result.metadata.attempts,
            quality = result.metadata.quality_score,
            elapsed_ms = result.metadata.generation_time_ms,
            "generation succeeded"
        );
        result
    }

    async fn upload(
        &self,
        request: &GenerationRequest,
        method: GenerationMethod,
        result: &mut GenerationResult,
    ) {
        let Some(store) = &self.artifact_store else {
            return;
        };
        let context = UploadContext {
            diagram_id: result.diagram_id.clone().unwrap_or_default(),
            diagram_type: request.diagram_type().to_string(),
            method,
            session_id: request.session_id().map(str::to_string),
            user_id: request.user_id().map(str::to_string),
        };

        let outcome = match timeout(self.request_timeout, store.upload(result, &context)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RunesmithError::StorageUpload(format!(
                "upload timed out after {:?}",
                self.request_timeout
            ))),
        };
        match outcome {
            Ok(url) => {
                result.artifact_url = Some(url);
                result.content_delivery = ContentDelivery::Url;
            }
            Err(e) => {
                metrics::counter!(telemetry::STORAGE_UPLOAD_FAILURES_TOTAL).increment(1);
                warn!(store = store.name(), error = %e, "artifact upload failed, delivering inline");
                result.artifact_url = None;
                result.content_delivery = ContentDelivery::Inline;
            }
        }
    }

    pub fn stats(&self) -> ConductorStats {
        ConductorStats {
            total_generations: self.counters.total.load(Ordering::Relaxed),
            fallbacks: self.counters.fallbacks.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
        }
    }
}
