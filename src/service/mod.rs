//! The caller-facing service: fire-and-forget submission, polling, and
//! the background maintenance lifecycle.
//!
//! [`DiagramService::submit`] registers a job and spawns a task that
//! drives it through the conductor. The task reports a fixed sequence of
//! stages and ends the job exactly once, as `completed` or `failed`. A
//! panic during dispatch fails the job. Fallback attempts inside the
//! conductor are only visible through the result's `fallback_used` flag.
//!
//! [`start`](DiagramService::start) spawns the two recurring sweeps
//! (result cache TTL, job retention); [`shutdown`](DiagramService::shutdown)
//! stops and joins them.

mod builder;

pub use builder::{Runesmith, RunesmithBuilder};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::Result;
use crate::cache::{CacheStats, Fingerprint};
use crate::conductor::{Conductor, ConductorStats};
use crate::jobs::{JobLedger, JobStats};
use crate::types::{GenerationRequest, GenerationResult, Job, JobId};

/// Stages reported while a job runs, with their progress percentage.
pub const STAGE_VALIDATION: (&str, u8) = ("validation", 10);
pub const STAGE_ROUTING: (&str, u8) = ("routing", 20);
pub const STAGE_GENERATING: (&str, u8) = ("generating", 40);
pub const STAGE_PROCESSING: (&str, u8) = ("processing", 80);

/// Intervals for the background sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceSchedule {
    pub cache_sweep_interval: Duration,
    pub job_sweep_interval: Duration,
    pub job_retention: Duration,
}

struct Maintenance {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct DiagramService {
    conductor: Arc<Conductor>,
    ledger: Arc<JobLedger>,
    schedule: MaintenanceSchedule,
    maintenance: Mutex<Option<Maintenance>>,
}

impl DiagramService {
    pub(crate) fn new(
        conductor: Arc<Conductor>,
        ledger: Arc<JobLedger>,
        schedule: MaintenanceSchedule,
    ) -> Self {
        Self {
            conductor,
            ledger,
            schedule,
            maintenance: Mutex::new(None),
        }
    }

    /// Queue a request and return its job id immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: GenerationRequest) -> JobId {
        let id = self.ledger.create(request.diagram_type());
        let conductor = Arc::clone(&self.conductor);
        let ledger = Arc::clone(&self.ledger);
        let span = info_span!("job", job_id = %id, diagram_type = %request.diagram_type());
        tokio::spawn(run_job(conductor, ledger, id, request).instrument(span));
        id
    }

    /// Snapshot of a job. Unknown or swept ids are
    /// [`JobNotFound`](crate::RunesmithError::JobNotFound).
    pub fn poll_status(&self, id: JobId) -> Result<Job> {
        self.ledger.status(id)
    }

    /// Generate synchronously, bypassing the job ledger.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.conductor.generate(request).await
    }

    /// Drop the cached result for `request`, if any.
    pub fn invalidate(&self, request: &GenerationRequest) -> Result<bool> {
        let Some(cache) = self.conductor.cache() else {
            return Ok(false);
        };
        Ok(cache.invalidate(&Fingerprint::of(request)?))
    }

    /// Drop every cached result. Returns the number removed.
    pub fn invalidate_all(&self) -> usize {
        self.conductor
            .cache()
            .map_or(0, |cache| cache.invalidate_all())
    }

    pub fn conductor(&self) -> &Arc<Conductor> {
        &self.conductor
    }

    pub fn ledger(&self) -> &Arc<JobLedger> {
        &self.ledger
    }

    /// `None` when caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.conductor.cache().map(|cache| cache.stats())
    }

    pub fn conductor_stats(&self) -> ConductorStats {
        self.conductor.stats()
    }

    pub fn job_stats(&self) -> JobStats {
        self.ledger.stats()
    }

    fn maintenance(&self) -> MutexGuard<'_, Option<Maintenance>> {
        self.maintenance.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the background sweeps. Does nothing if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut maintenance = self.maintenance();
        if maintenance.is_some() {
            debug!("maintenance already running");
            return;
        }

        let (shutdown, rx) = watch::channel(false);
        let mut tasks = Vec::with_capacity(2);

        if let Some(cache) = self.conductor.cache() {
            let cache = Arc::clone(cache);
            tasks.push(spawn_sweeper(
                "cache",
                self.schedule.cache_sweep_interval,
                rx.clone(),
                move || cache.sweep_expired(),
            ));
        }

        let ledger = Arc::clone(&self.ledger);
        let retention = self.schedule.job_retention;
        tasks.push(spawn_sweeper(
            "jobs",
            self.schedule.job_sweep_interval,
            rx,
            move || ledger.sweep(retention),
        ));

        info!(tasks = tasks.len(), "maintenance started");
        *maintenance = Some(Maintenance { shutdown, tasks });
    }

    /// Whether background sweeps are running.
    pub fn is_running(&self) -> bool {
        self.maintenance().is_some()
    }

    /// Stop the background sweeps and wait for them to exit.
    ///
    /// In-flight jobs are not cancelled.
    pub async fn shutdown(&self) {
        let Some(Maintenance { shutdown, tasks }) = self.maintenance().take() else {
            return;
        };
        let _ = shutdown.send(true);
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "maintenance task ended abnormally");
            }
        }
        info!("maintenance stopped");
    }
}

impl Drop for DiagramService {
    fn drop(&mut self) {
        if let Some(maintenance) = self.maintenance().take() {
            let _ = maintenance.shutdown.send(true);
        }
    }
}

async fn run_job(
    conductor: Arc<Conductor>,
    ledger: Arc<JobLedger>,
    id: JobId,
    request: GenerationRequest,
) {
    for (stage, progress) in [STAGE_VALIDATION, STAGE_ROUTING, STAGE_GENERATING] {
        report(&ledger, id, stage, progress);
    }

    // A panic during dispatch must still end the job.
    let dispatch =
        tokio::spawn(async move { conductor.generate(&request).await }.in_current_span());
    let outcome = match dispatch.await {
        Ok(Ok(result)) => {
            report(&ledger, id, STAGE_PROCESSING.0, STAGE_PROCESSING.1);
            ledger.complete(id, result)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "job failed");
            ledger.fail(id, e.to_string())
        }
        Err(e) => {
            warn!(error = %e, "job dispatch aborted");
            ledger.fail(id, "generation aborted unexpectedly")
        }
    };
    if let Err(e) = outcome {
        warn!(error = %e, "could not record job outcome");
    }
}

fn report(ledger: &JobLedger, id: JobId, stage: &str, progress: u8) {
    if let Err(e) = ledger.update_progress(id, stage, progress) {
        warn!(stage, error = %e, "could not record job progress");
    }
}

fn spawn_sweeper<F>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    sweep: F,
) -> JoinHandle<()>
where
    F: Fn() -> usize + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = sweep();
                    if removed > 0 {
                        debug!(sweeper = name, removed, "sweep removed entries");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!(sweeper = name, "sweeper stopped");
    })
}
