//! Interactive session: the state a front end shows while jobs run.
//!
//! A [`Session`] holds the user's current selection (tool, parameters,
//! files) and the state of the last submission (job id or batch list,
//! status, error, download reference). It owns one poll task per job; every
//! task runs under a child of the session's [`CancellationToken`], so
//! selecting another tool, calling [`Session::cancel`], or dropping the
//! session stops all of them deterministically.
//!
//! Poll tasks never touch the session directly. They send [`JobEvent`]s
//! over a channel and [`Session::next_event`] applies them, keyed by job id.
//!
//! ```text
//! select_tool ──▶ add_file… ──▶ start ──▶ next_event… ──▶ settled
//!      ▲                                                    │
//!      └───────────────── reset (cancels polling) ◀─────────┘
//! ```

use crate::client::{JobClient, JobRequest};
use crate::error::ClientError;
use crate::job::{Job, JobStatus, SubmitMode, Submission};
use crate::output::CompressionStats;
use crate::progress::{JobProgressCallback, ProgressCallback, Tee};
use crate::tool::{Tool, ToolParams};
use crate::upload::UploadFile;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A change reported by a poll task.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// The job moved to a new non-terminal status.
    Updated(Job),
    /// The poll chain ended; the job is settled or was cancelled.
    Finished(Job),
}

impl JobEvent {
    pub fn job(&self) -> &Job {
        match self {
            JobEvent::Updated(job) | JobEvent::Finished(job) => job,
        }
    }
}

/// Everything a front end renders about the last submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub mode: Option<SubmitMode>,
    /// Overall status for a single job; `None` for batches, which have no
    /// aggregate status.
    pub status: Option<JobStatus>,
    pub job_id: Option<String>,
    /// The single job, once submitted.
    pub job: Option<Job>,
    /// Per-file jobs, once a batch is submitted.
    pub batch: Vec<Job>,
    pub error: Option<String>,
    pub download_url: Option<String>,
    pub compression: Option<CompressionStats>,
}

impl SessionState {
    /// Every job of the last submission, in upload order.
    pub fn jobs(&self) -> Vec<&Job> {
        match &self.job {
            Some(job) => vec![job],
            None => self.batch.iter().collect(),
        }
    }
}

struct ChannelForwarder {
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl JobProgressCallback for ChannelForwarder {
    fn on_status(&self, job: &Job) {
        let _ = self.tx.send(JobEvent::Updated(job.clone()));
    }
}

/// One user's tool selection and the jobs it produced.
pub struct Session {
    client: JobClient,
    tool: Tool,
    params: ToolParams,
    files: Vec<UploadFile>,
    state: SessionState,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
    events: Option<mpsc::UnboundedReceiver<JobEvent>>,
}

impl Session {
    pub fn new(client: JobClient, tool: Tool) -> Self {
        Self {
            client,
            tool,
            params: ToolParams::default_for(tool),
            files: Vec::new(),
            state: SessionState::default(),
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
            events: None,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn params(&self) -> &ToolParams {
        &self.params
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Switch tools. Always resets, even when `tool` is already selected.
    ///
    /// Stops every running poll chain, then clears files, job ids, the
    /// batch list, status, error and download reference, and restores the
    /// tool's default parameters.
    pub fn select_tool(&mut self, tool: Tool) {
        info!(from = %self.tool, to = %tool, "Tool selected; resetting session");
        self.stop_polling();
        self.tool = tool;
        self.params = ToolParams::default_for(tool);
        self.files.clear();
        self.state = SessionState::default();
    }

    /// Replace the parameter set. It must belong to the selected tool.
    pub fn set_params(&mut self, params: ToolParams) -> Result<(), ClientError> {
        if params.tool() != self.tool {
            return Err(ClientError::ParamsMismatch {
                tool: self.tool.to_string(),
                params: params.tool().to_string(),
            });
        }
        self.params = params;
        Ok(())
    }

    /// Merge JSON overrides onto the current parameters.
    pub fn override_params(&mut self, overrides: serde_json::Value) -> Result<(), ClientError> {
        self.params = self.params.with_overrides(overrides)?;
        Ok(())
    }

    pub fn add_file(&mut self, file: UploadFile) {
        self.files.push(file);
    }

    pub fn set_files(&mut self, files: Vec<UploadFile>) {
        self.files = files;
    }

    /// Submission is possible once files are selected and nothing is running.
    pub fn can_submit(&self) -> bool {
        !self.files.is_empty() && !self.is_running()
    }

    /// `true` while any poll task is alive.
    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Submit the current selection and start polling every created job.
    ///
    /// On failure the error's user message is stored in the state and the
    /// error is returned.
    pub async fn start(&mut self) -> Result<(), ClientError> {
        if self.files.is_empty() {
            return Err(ClientError::NoFiles);
        }
        self.stop_polling();
        self.state = SessionState {
            status: Some(JobStatus::Uploading),
            ..SessionState::default()
        };

        let request = JobRequest {
            tool: self.tool,
            params: self.params.clone(),
            files: self.files.clone(),
        };
        let submission = match self.client.submit(&request).await {
            Ok(s) => s,
            Err(e) => {
                self.state.status = None;
                self.state.error = Some(e.user_message());
                return Err(e);
            }
        };

        let mode = submission.mode();
        let cadence = self.client.cadence(mode);
        self.state.mode = Some(mode);
        match &submission {
            Submission::Single(job) => {
                self.state.job = Some(job.clone());
                self.sync_single();
            }
            Submission::Batch(batch) => {
                self.state.status = None;
                self.state.batch = batch.items.clone();
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder: ProgressCallback = Arc::new(ChannelForwarder { tx: tx.clone() });
        let progress = match self.client.progress() {
            Some(user) => Arc::new(Tee {
                first: Arc::clone(user),
                second: forwarder,
            }) as ProgressCallback,
            None => forwarder,
        };
        let run_client = self.client.clone().with_progress(progress);

        for job in submission.into_jobs() {
            if job.is_settled() || job.id.is_none() {
                continue;
            }
            let client = run_client.clone();
            let token = self.cancel.child_token();
            let tx = tx.clone();
            self.tasks.spawn(async move {
                let job = client.poll(job, cadence, &token).await;
                let _ = tx.send(JobEvent::Finished(job));
            });
        }
        debug!(tasks = self.tasks.len(), "Poll tasks started");
        self.events = Some(rx);
        Ok(())
    }

    /// Wait for the next event from a poll task and apply it.
    ///
    /// Returns `None` once no task is left to report.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        let event = self.events.as_mut()?.recv().await?;
        if let JobEvent::Finished(_) = event {
            // Reap the finished task so `is_running` stays accurate.
            let _ = self.tasks.try_join_next();
        }
        self.apply(event.job().clone());
        Some(event)
    }

    /// Drive events until every job is settled or polling stops.
    pub async fn wait(&mut self) -> &SessionState {
        while !self.is_settled() {
            if self.next_event().await.is_none() {
                break;
            }
        }
        // Every chain has reported or been cancelled by now.
        while self.tasks.join_next().await.is_some() {}
        let jobs = self.state.jobs();
        let completed = jobs.iter().filter(|j| j.status == JobStatus::Completed).count();
        info!(total = jobs.len(), completed, "Session settled");
        if let Some(cb) = self.client.progress() {
            cb.on_all_settled(jobs.len(), completed);
        }
        &self.state
    }

    /// `true` when the last submission has no job left to poll.
    pub fn is_settled(&self) -> bool {
        let jobs = self.state.jobs();
        !jobs.is_empty() && jobs.iter().all(|j| j.is_settled())
    }

    /// Stop every poll chain. Jobs keep their last observed state.
    pub fn cancel(&mut self) {
        self.stop_polling();
    }

    /// A token that cancels this session's current polling when triggered,
    /// e.g. from a Ctrl-C handler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn stop_polling(&mut self) {
        if !self.tasks.is_empty() {
            debug!(tasks = self.tasks.len(), "Stopping poll tasks");
        }
        self.cancel.cancel();
        self.tasks.abort_all();
        self.tasks = JoinSet::new();
        self.events = None;
        self.cancel = CancellationToken::new();
    }

    /// Record one job's latest state. Only the entry with the same id changes.
    fn apply(&mut self, job: Job) {
        if let Some(current) = self.state.job.as_mut() {
            if current.id != job.id || current.is_terminal() {
                return;
            }
            *current = job;
            self.sync_single();
            return;
        }
        let Some(id) = job.id.clone() else {
            return;
        };
        if let Some(slot) = self
            .state
            .batch
            .iter_mut()
            .find(|j| j.id.as_deref() == Some(id.as_str()))
        {
            if !slot.is_terminal() {
                *slot = job;
            }
        }
    }

    /// Mirror the single job onto the top-level state fields.
    fn sync_single(&mut self) {
        let Some(job) = &self.state.job else {
            return;
        };
        self.state.status = Some(job.status);
        self.state.job_id = job.id.clone();
        self.state.download_url = job.result_url.clone();
        self.state.compression = job.compression;
        self.state.error = job.error_message();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
