//! Client-side job state.
//!
//! A [`Job`] mirrors one server-tracked unit of work. It is created in
//! [`JobStatus::Uploading`] before the service has assigned an id, then
//! advanced by status reports until it reaches a terminal status. The
//! service is the only source of truth; this module just refuses to move a
//! job backwards or out of a terminal state.

use crate::error::JobFailure;
use crate::output::{CompressionStats, StatusReport};
use crate::tool::Tool;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Client-only: files are being sent, no id yet.
    Uploading,
    Submitted,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` or `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Uploading => 0,
            JobStatus::Submitted => 1,
            JobStatus::Queued => 2,
            JobStatus::Processing => 3,
            JobStatus::Completed | JobStatus::Failed => 4,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Uploading => "uploading",
            JobStatus::Submitted => "submitted",
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a poll chain should do after observing a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Not terminal yet; query again after the cadence delay.
    Continue,
    /// Terminal; the chain ends.
    Stop,
}

/// Which endpoint a submission goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// `POST /jobs`: one job covering every file.
    Single,
    /// `POST /jobs/batch`: one job per file.
    Batch,
}

impl SubmitMode {
    /// Several files with any tool other than merge become a batch.
    pub fn for_request(tool: Tool, file_count: usize) -> Self {
        if file_count > 1 && !tool.combines_files() {
            SubmitMode::Batch
        } else {
            SubmitMode::Single
        }
    }
}

/// One job as seen by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Server-assigned id; `None` while uploading or when the service
    /// refused the item before creating a job.
    pub id: Option<String>,
    pub tool: Tool,
    /// Input file name, for batch items.
    pub filename: Option<String>,
    pub status: JobStatus,
    /// Download reference, set once completed.
    pub result_url: Option<String>,
    pub failure: Option<JobFailure>,
    /// Raw `output` from the last status report.
    pub output: Option<serde_json::Value>,
    pub compression: Option<CompressionStats>,
}

impl Job {
    /// A job that is still being uploaded.
    pub fn uploading(tool: Tool) -> Self {
        Self {
            id: None,
            tool,
            filename: None,
            status: JobStatus::Uploading,
            result_url: None,
            failure: None,
            output: None,
            compression: None,
        }
    }

    /// A job the service has accepted under `id`.
    pub fn accepted(tool: Tool, id: impl Into<String>, status: JobStatus) -> Self {
        let mut job = Self::uploading(tool);
        job.id = Some(id.into());
        job.status = JobStatus::Submitted;
        // Terminal states are learned from polling so the output comes along.
        if !status.is_terminal() {
            job.advance(status);
        }
        job
    }

    /// A job the service refused at submission time.
    pub fn rejected(tool: Tool, id: Option<String>, reason: Option<String>) -> Self {
        let mut job = Self::uploading(tool);
        job.id = id;
        job.status = JobStatus::Failed;
        job.failure = Some(JobFailure::Service(reason.unwrap_or_default()));
        job
    }

    pub fn with_filename(mut self, filename: Option<String>) -> Self {
        self.filename = filename;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Settled means no poll chain will touch this job again: terminal, or
    /// stopped with a recorded failure.
    pub fn is_settled(&self) -> bool {
        self.is_terminal() || self.failure.is_some()
    }

    /// Move to `next` if that keeps the lifecycle monotonic. Returns whether
    /// the status changed.
    pub fn advance(&mut self, next: JobStatus) -> bool {
        if self.status == next {
            return false;
        }
        if !self.status.can_advance_to(next) {
            debug!(
                job_id = self.id.as_deref().unwrap_or("-"),
                from = %self.status,
                to = %next,
                "Ignoring non-monotonic status"
            );
            return false;
        }
        self.status = next;
        true
    }

    /// Apply one status report and decide whether polling continues.
    ///
    /// `result_base` is the service root used to build the download
    /// reference, e.g. `http://localhost:8000`.
    pub fn observe(&mut self, report: &StatusReport, result_base: &str) -> PollDecision {
        if self.is_terminal() {
            return PollDecision::Stop;
        }
        self.advance(report.status);
        match self.status {
            JobStatus::Completed => {
                if let Some(ref id) = self.id {
                    self.result_url = Some(format!("{result_base}/jobs/{id}/result"));
                }
                self.output = report.output.clone();
                self.compression = report.compression();
                PollDecision::Stop
            }
            JobStatus::Failed => {
                self.failure = Some(JobFailure::Service(report.error.clone().unwrap_or_default()));
                PollDecision::Stop
            }
            _ => PollDecision::Continue,
        }
    }

    /// Human-readable failure line, if any.
    pub fn error_message(&self) -> Option<String> {
        self.failure.as_ref().map(JobFailure::message)
    }
}

/// Jobs created by one batch submission, in upload order.
///
/// There is no batch-level status; each item settles on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub tool: Tool,
    pub items: Vec<Job>,
}

impl BatchJob {
    pub fn new(tool: Tool, items: Vec<Job>) -> Self {
        Self { tool, items }
    }

    /// Item with server id `job_id`.
    pub fn get(&self, job_id: &str) -> Option<&Job> {
        self.items.iter().find(|j| j.id.as_deref() == Some(job_id))
    }

    /// Replace the item whose id matches `job.id`. Other items are untouched.
    pub fn update(&mut self, job: Job) -> bool {
        let Some(id) = job.id.clone() else {
            return false;
        };
        match self.items.iter_mut().find(|j| j.id.as_deref() == Some(id.as_str())) {
            Some(slot) => {
                *slot = job;
                true
            }
            None => false,
        }
    }

    pub fn completed(&self) -> usize {
        self.items.iter().filter(|j| j.status == JobStatus::Completed).count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|j| j.failure.is_some()).count()
    }

    pub fn is_settled(&self) -> bool {
        self.items.iter().all(Job::is_settled)
    }
}

/// What `submit` hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Submission {
    Single(Job),
    Batch(BatchJob),
}

impl Submission {
    /// All jobs in submission order.
    pub fn jobs(&self) -> Vec<&Job> {
        match self {
            Submission::Single(job) => vec![job],
            Submission::Batch(batch) => batch.items.iter().collect(),
        }
    }

    pub fn into_jobs(self) -> Vec<Job> {
        match self {
            Submission::Single(job) => vec![job],
            Submission::Batch(batch) => batch.items,
        }
    }

    pub fn mode(&self) -> SubmitMode {
        match self {
            Submission::Single(_) => SubmitMode::Single,
            Submission::Batch(_) => SubmitMode::Batch,
        }
    }
}
