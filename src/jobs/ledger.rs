//! Job ledger.
//!
//! One shared map from [`JobId`] to [`Job`]. Every operation takes the
//! lock for a short, non-awaiting section, so readers never see a
//! half-written job.
//!
//! # Transition rules
//!
//! - Status only moves forward: `queued → processing → completed|failed`.
//!   [`complete`](JobLedger::complete) and [`fail`](JobLedger::fail) also
//!   accept a queued job; the processing step is then implicit and never
//!   observed by pollers.
//! - Progress never decreases; a lower value keeps the old one.
//! - Once terminal, a job is frozen. Later updates are ignored and
//!   reported as `Ok(false)`.
//! - [`sweep`](JobLedger::sweep) removes terminal jobs whose finish time
//!   is older than the retention window and never touches live jobs.
//!
//! Retention is measured on tokio's monotonic clock, which a paused test
//! runtime controls. The wall-clock `finished_at` on the snapshot is for
//! callers; [`sweep_before`](JobLedger::sweep_before) compares against it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;
use crate::types::{GenerationResult, Job, JobId, JobStatus};
use crate::{Result, RunesmithError};

/// Largest reportable progress value.
pub const MAX_PROGRESS: u8 = 100;

/// Job counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub total: usize,
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

struct Entry {
    job: Job,
    /// Set together with `job.finished_at`.
    finished: Option<Instant>,
}

impl Entry {
    fn finish(&mut self, status: JobStatus) {
        let now = Utc::now();
        self.job.status = status;
        self.job.stage = status.to_string();
        self.job.updated_at = now;
        self.job.finished_at = Some(now);
        self.finished = Some(Instant::now());
    }
}

#[derive(Default)]
pub struct JobLedger {
    jobs: Mutex<HashMap<JobId, Entry>>,
}

impl JobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // No section leaves a job partially updated, so a poisoned map is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Entry>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new queued job for a request of `diagram_type`.
    pub fn create(&self, diagram_type: &str) -> JobId {
        let job = Job::queued(diagram_type);
        let id = job.id;
        self.lock().insert(
            id,
            Entry {
                job,
                finished: None,
            },
        );
        debug!(job_id = %id, diagram_type, "job created");
        id
    }

    /// Record progress. Moves a queued job to processing.
    ///
    /// Returns `Ok(false)` if the job is already terminal.
    pub fn update_progress(&self, id: JobId, stage: &str, progress: u8) -> Result<bool> {
        let mut jobs = self.lock();
        let job = &mut jobs.get_mut(&id).ok_or(RunesmithError::JobNotFound(id))?.job;
        if job.is_terminal() {
            debug!(job_id = %id, stage, "ignoring progress on terminal job");
            return Ok(false);
        }
        job.status = JobStatus::Processing;
        job.stage = stage.to_string();
        job.progress = job.progress.max(progress.min(MAX_PROGRESS));
        job.updated_at = Utc::now();
        Ok(true)
    }

    /// Mark the job completed with its result.
    ///
    /// Returns `Ok(false)` if the job is already terminal.
    pub fn complete(&self, id: JobId, result: GenerationResult) -> Result<bool> {
        let mut jobs = self.lock();
        let entry = jobs.get_mut(&id).ok_or(RunesmithError::JobNotFound(id))?;
        if entry.job.is_terminal() {
            return Ok(false);
        }
        entry.finish(JobStatus::Completed);
        entry.job.progress = MAX_PROGRESS;
        entry.job.generation_method = result.metadata.generation_method;
        entry.job.result = Some(result);
        drop(jobs);

        metrics::counter!(telemetry::JOBS_TOTAL, "status" => "completed").increment(1);
        debug!(job_id = %id, "job completed");
        Ok(true)
    }

    /// Mark the job failed with a caller-facing message.
    ///
    /// Progress is left where it stopped. Returns `Ok(false)` if the job
    /// is already terminal.
    pub fn fail(&self, id: JobId, error: impl Into<String>) -> Result<bool> {
        let mut jobs = self.lock();
        let entry = jobs.get_mut(&id).ok_or(RunesmithError::JobNotFound(id))?;
        if entry.job.is_terminal() {
            return Ok(false);
        }
        entry.finish(JobStatus::Failed);
        entry.job.error = Some(error.into());
        drop(jobs);

        metrics::counter!(telemetry::JOBS_TOTAL, "status" => "failed").increment(1);
        debug!(job_id = %id, "job failed");
        Ok(true)
    }

    /// Snapshot of a job.
    pub fn status(&self, id: JobId) -> Result<Job> {
        self.lock()
            .get(&id)
            .map(|entry| entry.job.clone())
            .ok_or(RunesmithError::JobNotFound(id))
    }

    /// Remove terminal jobs that finished more than `retention` ago.
    pub fn sweep(&self, retention: Duration) -> usize {
        // A window reaching back past the clock's origin keeps everything.
        let Some(cutoff) = Instant::now().checked_sub(retention) else {
            return 0;
        };
        self.remove_finished(|entry| entry.finished.is_some_and(|at| at < cutoff))
    }

    /// Remove terminal jobs whose wall-clock finish time is before `cutoff`.
    pub fn sweep_before(&self, cutoff: DateTime<Utc>) -> usize {
        self.remove_finished(|entry| entry.job.finished_at.is_some_and(|at| at < cutoff))
    }

    fn remove_finished(&self, expired: impl Fn(&Entry) -> bool) -> usize {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, entry| !(entry.job.is_terminal() && expired(entry)));
        let removed = before - jobs.len();
        drop(jobs);

        if removed > 0 {
            debug!(removed, "swept finished jobs");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> JobStats {
        let jobs = self.lock();
        let mut stats = JobStats {
            total: jobs.len(),
            ..JobStats::default()
        };
        for entry in jobs.values() {
            match entry.job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}
