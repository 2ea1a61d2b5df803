//! Progress-callback trait for job lifecycle events.
//!
//! Attach an [`Arc<dyn JobProgressCallback>`] with
//! [`crate::client::JobClient::with_progress`] to hear about submissions,
//! status changes and terminal outcomes as they happen. Callers can forward
//! these to a terminal progress bar, a channel, or a log, without the
//! library knowing how the host application talks to its user.
//!
//! # Example
//!
//! ```rust
//! use pdfsimple_client::{Job, JobProgressCallback};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountDone(AtomicUsize);
//!
//! impl JobProgressCallback for CountDone {
//!     fn on_job_complete(&self, job: &Job) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} finished", job.id.as_deref().unwrap_or("?"));
//!     }
//! }
//! ```

use crate::job::{Job, SubmitMode};
use std::sync::Arc;

/// Called by the client as jobs move through their lifecycle.
///
/// Batch items are polled by independent tasks, so every method may be
/// called concurrently from different threads. All methods default to
/// no-ops.
pub trait JobProgressCallback: Send + Sync {
    /// Called once the service has answered a submission.
    ///
    /// # Arguments
    /// * `mode` — single or batch endpoint
    /// * `jobs` — the jobs created, in upload order (some may already be failed)
    fn on_submitted(&self, mode: SubmitMode, jobs: &[Job]) {
        let _ = (mode, jobs);
    }

    /// Called when a poll observes a new non-terminal status.
    fn on_status(&self, job: &Job) {
        let _ = job;
    }

    /// Called when a job reaches `completed`.
    fn on_job_complete(&self, job: &Job) {
        let _ = job;
    }

    /// Called when a job fails or its polling stops with an error.
    ///
    /// # Arguments
    /// * `job`   — the job, with `failure` set
    /// * `error` — human-readable reason
    fn on_job_failed(&self, job: &Job, error: &str) {
        let _ = (job, error);
    }

    /// Called by [`crate::session::Session::wait`] once every job is settled.
    ///
    /// # Arguments
    /// * `total`     — number of jobs in the submission
    /// * `completed` — how many of them completed
    fn on_all_settled(&self, total: usize, completed: usize) {
        let _ = (total, completed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias for the type stored on [`crate::client::JobClient`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;

/// Fan one event out to two callbacks.
pub(crate) struct Tee {
    pub(crate) first: ProgressCallback,
    pub(crate) second: ProgressCallback,
}

impl JobProgressCallback for Tee {
    fn on_submitted(&self, mode: SubmitMode, jobs: &[Job]) {
        self.first.on_submitted(mode, jobs);
        self.second.on_submitted(mode, jobs);
    }

    fn on_status(&self, job: &Job) {
        self.first.on_status(job);
        self.second.on_status(job);
    }

    fn on_job_complete(&self, job: &Job) {
        self.first.on_job_complete(job);
        self.second.on_job_complete(job);
    }

    fn on_job_failed(&self, job: &Job, error: &str) {
        self.first.on_job_failed(job, error);
        self.second.on_job_failed(job, error);
    }

    fn on_all_settled(&self, total: usize, completed: usize) {
        self.first.on_all_settled(total, completed);
        self.second.on_all_settled(total, completed);
    }
}
