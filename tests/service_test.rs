//! End-to-end tests for job submission, polling and maintenance.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use runesmith::cache::CacheConfig;
use runesmith::{
    ArtifactStore, Backend, Config, DiagramService, GenerationMethod, GenerationRequest, GenerationResult, Job, JobId,
    JobStatus, Result, Runesmith, RunesmithError, UploadContext,
};

use GenerationMethod::{Mermaid, SvgTemplate};

// ============================================================================
// Mock backend
// ============================================================================

struct SlowBackend {
    method: GenerationMethod,
    delay: Duration,
    fail: bool,
    calls: AtomicU32,
}

impl SlowBackend {
    fn ok(method: GenerationMethod, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            method,
            delay,
            fail: false,
            calls: AtomicU32::new(0),
        })
    }

    fn failing(method: GenerationMethod) -> Arc<Self> {
        Arc::new(Self {
            method,
            delay: Duration::ZERO,
            fail: true,
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl Backend for SlowBackend {
    fn method(&self) -> GenerationMethod {
        self.method
    }

    async fn supports(&self, _diagram_type: &str) -> bool {
        true
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(RunesmithError::Backend {
                method: self.method,
                message: "renderer crashed".into(),
            });
        }
        Ok(GenerationResult::new(
            format!("<svg><!-- {} --></svg>", request.content()),
            "svg",
        ))
    }
}

struct PanickingBackend(GenerationMethod);

#[async_trait]
impl Backend for PanickingBackend {
    fn method(&self) -> GenerationMethod {
        self.0
    }

    async fn supports(&self, _diagram_type: &str) -> bool {
        true
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResult> {
        panic!("renderer segfaulted");
    }
}

struct PanickingStore;

#[async_trait]
impl ArtifactStore for PanickingStore {
    fn name(&self) -> &str {
        "panicking-store"
    }

    async fn upload(&self, _result: &GenerationResult, _context: &UploadContext) -> Result<String> {
        panic!("storage client poisoned");
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn request() -> GenerationRequest {
    GenerationRequest::new("Plan, build, ship", "cycle_3_step").unwrap()
}

/// Poll until the job is terminal, collecting every snapshot seen.
async fn wait_for(service: &DiagramService, id: JobId) -> Vec<Job> {
    let mut seen = Vec::new();
    for _ in 0..1_000 {
        let job = service.poll_status(id).unwrap();
        let done = job.is_terminal();
        seen.push(job);
        if done {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {id} never finished");
}

fn last(snapshots: &[Job]) -> &Job {
    snapshots.last().unwrap()
}

// ============================================================================
// Submit + poll
// ============================================================================

#[tokio::test(start_paused = true)]
async fn submitted_job_completes_with_result() {
    let svg = SlowBackend::ok(SvgTemplate, Duration::from_millis(50));
    let service = Runesmith::builder().backend(svg).build().unwrap();

    let id = service.submit(request());
    let snapshots = wait_for(&service, id).await;
    let job = last(&snapshots);

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.stage, "completed");
    assert_eq!(job.generation_method, Some(SvgTemplate));
    assert_eq!(job.diagram_type, "cycle_3_step");
    assert!(job.result.as_ref().unwrap().content.contains("Plan, build, ship"));
}

#[tokio::test(start_paused = true)]
async fn observed_progress_is_monotonic() {
    let svg = SlowBackend::ok(SvgTemplate, Duration::from_millis(100));
    let service = Runesmith::builder().backend(svg).build().unwrap();

    let id = service.submit(request());
    let snapshots = wait_for(&service, id).await;

    assert!(snapshots.len() > 2);
    for pair in snapshots.windows(2) {
        assert!(pair[0].progress <= pair[1].progress);
    }
    // Observed mid-generation at least once.
    assert!(
        snapshots
            .iter()
            .any(|job| job.status == JobStatus::Processing && job.stage == "generating")
    );
}

#[tokio::test(start_paused = true)]
async fn fallback_success_is_a_completed_job() {
    let svg = SlowBackend::failing(SvgTemplate);
    let mermaid = SlowBackend::ok(Mermaid, Duration::from_millis(10));
    let service = Runesmith::builder()
        .backend(svg)
        .backend(mermaid)
        .build()
        .unwrap();

    let id = service.submit(request());
    let job = last(&wait_for(&service, id).await).clone();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.generation_method, Some(Mermaid));
    assert!(job.result.unwrap().metadata.fallback_used);
}

#[tokio::test(start_paused = true)]
async fn exhausted_job_fails_with_stable_message() {
    let svg = SlowBackend::failing(SvgTemplate);
    let mermaid = SlowBackend::failing(Mermaid);
    let service = Runesmith::builder()
        .backend(svg)
        .backend(mermaid)
        .build()
        .unwrap();

    let id = service.submit(request());
    let job = last(&wait_for(&service, id).await).clone();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.stage, "failed");
    assert!(job.progress < 100);
    assert!(job.result.is_none());
    assert_eq!(
        job.error.as_deref(),
        Some("all generation methods failed (2 attempted)")
    );
}

#[tokio::test(start_paused = true)]
async fn panicking_primary_still_completes_via_fallback() {
    let mermaid = SlowBackend::ok(Mermaid, Duration::from_millis(10));
    let service = Runesmith::builder()
        .backend(Arc::new(PanickingBackend(SvgTemplate)))
        .backend(mermaid.clone())
        .build()
        .unwrap();

    let id = service.submit(request());
    let job = last(&wait_for(&service, id).await).clone();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.generation_method, Some(Mermaid));
    assert!(job.result.unwrap().metadata.fallback_used);
    assert_eq!(mermaid.calls.load(Ordering::Relaxed), 1);
}

#[tokio::test(start_paused = true)]
async fn panic_outside_backends_fails_the_job() {
    let svg = SlowBackend::ok(SvgTemplate, Duration::ZERO);
    let service = Runesmith::builder()
        .backend(svg)
        .artifact_store(Arc::new(PanickingStore))
        .build()
        .unwrap();

    let id = service.submit(request());
    let job = last(&wait_for(&service, id).await).clone();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("generation aborted unexpectedly"));
    assert!(job.result.is_none());
    assert_eq!(service.job_stats().processing, 0);
}

#[tokio::test(start_paused = true)]
async fn second_submission_is_served_from_cache() {
    let svg = SlowBackend::ok(SvgTemplate, Duration::from_millis(10));
    let service = Runesmith::builder().backend(svg.clone()).build().unwrap();

    let first = service.submit(request());
    wait_for(&service, first).await;
    let second = service.submit(request());
    let job = last(&wait_for(&service, second).await).clone();

    assert_ne!(first, second);
    assert!(job.result.unwrap().metadata.cache_hit);
    assert_eq!(svg.calls.load(Ordering::Relaxed), 1);
}

#[tokio::test(start_paused = true)]
async fn terminal_polls_are_idempotent() {
    let svg = SlowBackend::ok(SvgTemplate, Duration::ZERO);
    let service = Runesmith::builder().backend(svg).build().unwrap();

    let id = service.submit(request());
    wait_for(&service, id).await;
    let a = service.poll_status(id).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let b = service.poll_status(id).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let svg = SlowBackend::ok(SvgTemplate, Duration::ZERO);
    let service = Runesmith::builder().backend(svg).build().unwrap();
    let err = service.poll_status(JobId::new()).unwrap_err();
    assert!(matches!(err, RunesmithError::JobNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn job_stats_track_outcomes() {
    let svg = SlowBackend::failing(SvgTemplate);
    let mermaid = SlowBackend::ok(Mermaid, Duration::ZERO);
    let service = Runesmith::builder()
        .backend(svg)
        .backend(mermaid)
        .build()
        .unwrap();

    let ok = service.submit(request());
    let forced = service.submit(
        GenerationRequest::builder("x", "flowchart")
            .method(GenerationMethod::PythonChart)
            .build()
            .unwrap(),
    );
    wait_for(&service, ok).await;
    wait_for(&service, forced).await;

    let stats = service.job_stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
}

// ============================================================================
// Maintenance lifecycle
// ============================================================================

#[tokio::test]
async fn start_is_idempotent_and_shutdown_stops() {
    let svg = SlowBackend::ok(SvgTemplate, Duration::ZERO);
    let service = Runesmith::builder().backend(svg).build().unwrap();

    assert!(!service.is_running());
    service.start();
    service.start();
    assert!(service.is_running());

    service.shutdown().await;
    assert!(!service.is_running());

    // Shutting down twice is harmless.
    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn cache_sweeper_removes_expired_results() {
    let svg = SlowBackend::ok(SvgTemplate, Duration::ZERO);
    let service = Runesmith::builder()
        .backend(svg)
        .cache(
            CacheConfig::new()
                .ttl(Duration::from_secs(10))
                .sweep_interval(Duration::from_secs(5)),
        )
        .build()
        .unwrap();
    service.start();

    service.generate(&request()).await.unwrap();
    assert_eq!(service.cache_stats().unwrap().current_size, 1);

    tokio::time::sleep(Duration::from_secs(16)).await;
    let stats = service.cache_stats().unwrap();
    assert_eq!(stats.current_size, 0);
    assert_eq!(stats.expirations, 1);

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn job_sweeper_forgets_finished_jobs_after_retention() {
    let mut config = Config::default();
    config.jobs.retention_secs = 60;
    config.jobs.sweep_interval_secs = 10;
    let service = Runesmith::builder()
        .config(config)
        .backend(SlowBackend::ok(SvgTemplate, Duration::ZERO))
        .build()
        .unwrap();
    service.start();

    let id = service.submit(request());
    wait_for(&service, id).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(service.poll_status(id).is_ok());

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(matches!(
        service.poll_status(id),
        Err(RunesmithError::JobNotFound(_))
    ));
    assert_eq!(service.job_stats().total, 0);

    service.shutdown().await;
}

#[tokio::test]
async fn invalidate_all_clears_cache() {
    let svg = SlowBackend::ok(SvgTemplate, Duration::ZERO);
    let service = Runesmith::builder().backend(svg).build().unwrap();

    service.generate(&request()).await.unwrap();
    service
        .generate(&GenerationRequest::new("other", "flowchart").unwrap())
        .await
        .unwrap();
    assert_eq!(service.invalidate_all(), 2);
    assert_eq!(service.cache_stats().unwrap().current_size, 0);
}
