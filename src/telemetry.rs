//! Telemetry metric name constants.
//!
//! Centralised metric names for runesmith operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `runesmith_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `method`: generation method (e.g. "svg_template", "mermaid")
//! - `outcome`: attempt outcome: "ok", "unsupported", "timeout", "error"
//! - `status`: terminal outcome: "ok", "cache_hit" or "exhausted"

/// Total generation requests handled by the conductor.
///
/// Labels: `status` ("ok" | "cache_hit" | "exhausted").
pub const REQUESTS_TOTAL: &str = "runesmith_requests_total";

/// End-to-end dispatch duration in seconds for successful requests.
///
/// Labels: `method`.
pub const REQUEST_DURATION_SECONDS: &str = "runesmith_request_duration_seconds";

/// Total backend attempts, one per step of the fallback chain.
///
/// Labels: `method`, `outcome`.
pub const ATTEMPTS_TOTAL: &str = "runesmith_attempts_total";

/// Total steps taken along fallback chains.
pub const FALLBACKS_TOTAL: &str = "runesmith_fallbacks_total";

/// Total result cache hits.
pub const CACHE_HITS_TOTAL: &str = "runesmith_cache_hits_total";

/// Total result cache misses (including expired entries).
pub const CACHE_MISSES_TOTAL: &str = "runesmith_cache_misses_total";

/// Total entries evicted by capacity pressure.
pub const CACHE_EVICTIONS_TOTAL: &str = "runesmith_cache_evictions_total";

/// Total entries dropped because their TTL elapsed.
pub const CACHE_EXPIRATIONS_TOTAL: &str = "runesmith_cache_expirations_total";

/// Total artifact uploads that failed (generation still succeeded).
pub const STORAGE_UPLOAD_FAILURES_TOTAL: &str = "runesmith_storage_upload_failures_total";

/// Total jobs reaching a terminal state.
///
/// Labels: `status` ("completed" | "failed").
pub const JOBS_TOTAL: &str = "runesmith_jobs_total";
