//! Error types for the pdfsimple-client library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ClientError`] — **Per call**: one request could not be made or its
//!   answer could not be used (no files selected, network down, HTTP 429,
//!   undecodable body). Returned as `Err(ClientError)` from the
//!   [`crate::client::JobClient`] methods.
//!
//! * [`JobFailure`] — **Per job**: a single job ended badly (the service
//!   reported `failed`, or its status could no longer be checked) while its
//!   siblings in the same batch carry on. Stored inside
//!   [`crate::job::Job`] rather than propagated.
//!
//! Both types render a short human-readable line through
//! [`ClientError::user_message`] / [`JobFailure::message`]; the service is the
//! authority on failure cause, so no structured code is surfaced beyond that.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown when a submission cannot be delivered.
pub const UPLOAD_FAILED: &str = "Upload failed";

/// Message shown when the service rejects a request with HTTP 429.
pub const RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";

/// Message shown when a status query cannot be completed.
pub const STATUS_CHECK_FAILED: &str = "Error checking status";

/// Message shown when the service reports `failed` without a reason.
pub const JOB_FAILED: &str = "Job failed to process.";

/// Errors returned by [`crate::client::JobClient`] calls.
#[derive(Debug, Error)]
pub enum ClientError {
    // ── Request construction ──────────────────────────────────────────────
    /// Submission attempted with an empty file list.
    #[error("No files selected\nAdd at least one input file before submitting.")]
    NoFiles,

    /// The tool identifier is not one the service knows.
    #[error("Unknown tool '{0}'\nRun `pdfsimple tools` for the list of supported tools.")]
    UnknownTool(String),

    /// The parameter set belongs to a different tool than the one requested.
    #[error("Parameters for '{params}' cannot be used with tool '{tool}'")]
    ParamsMismatch { tool: String, params: String },

    /// A parameter override could not be applied to the tool's parameter set.
    #[error("Invalid parameters for '{tool}': {detail}")]
    InvalidParams { tool: String, detail: String },

    /// An input file could not be read from disk.
    #[error("Failed to read input file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Transport / HTTP ──────────────────────────────────────────────────
    /// The request never produced an HTTP response (DNS, refused, timeout).
    #[error("Request to '{url}' failed: {reason}")]
    Transport { url: String, reason: String },

    /// The service answered HTTP 429.
    #[error("Rate limit exceeded by the service")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The service answered with a non-success status other than 429/404.
    #[error("Service returned HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// `GET /jobs/{id}` answered 404.
    #[error("Job '{job_id}' not found")]
    JobNotFound { job_id: String },

    /// `GET /jobs/{id}/result` answered 404.
    #[error("Result for job '{job_id}' is not available")]
    ResultNotAvailable { job_id: String },

    /// The body could not be decoded into the expected shape.
    #[error("Unexpected response from '{url}': {detail}")]
    Decode { url: String, detail: String },

    // ── Output ────────────────────────────────────────────────────────────
    /// Could not write a downloaded result to disk.
    #[error("Failed to write result file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// `true` for HTTP 429 rejections.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::RateLimited { .. })
    }

    /// Short message suitable for an end user, as opposed to the
    /// diagnostic `Display` output.
    ///
    /// Submission-side transport and HTTP failures collapse to
    /// [`UPLOAD_FAILED`]; a 429 always maps to [`RATE_LIMITED`] so callers can
    /// tell the two apart.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::RateLimited { .. } => RATE_LIMITED.to_string(),
            ClientError::Transport { .. } | ClientError::Decode { .. } => UPLOAD_FAILED.to_string(),
            ClientError::Http { detail, .. } if !detail.is_empty() => {
                format!("{UPLOAD_FAILED}: {detail}")
            }
            ClientError::Http { .. } => UPLOAD_FAILED.to_string(),
            ClientError::NoFiles => "Select at least one file".to_string(),
            ClientError::JobNotFound { .. } => {
                STATUS_CHECK_FAILED.to_string()
            }
            // Display carries a hint on the following lines; keep the headline.
            other => other.to_string().lines().next().unwrap_or_default().to_string(),
        }
    }
}

/// Why a single job did not produce a result.
///
/// Stored on [`crate::job::Job::failure`]. Siblings in the same batch are
/// never affected by one item's failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum JobFailure {
    /// The service reported the terminal status `failed`.
    #[error("{0}")]
    Service(String),

    /// The status could not be checked any more; polling stopped.
    #[error("Error checking status: {0}")]
    StatusCheck(String),

    /// The service refused the work with HTTP 429.
    #[error("Rate limited")]
    RateLimited,

    /// Polling gave up before the job reached a terminal status.
    #[error("Gave up after {0} status checks")]
    PollLimit(u32),
}

impl JobFailure {
    /// Short user-facing line.
    pub fn message(&self) -> String {
        match self {
            JobFailure::Service(msg) if msg.trim().is_empty() => JOB_FAILED.to_string(),
            JobFailure::Service(msg) => msg.clone(),
            JobFailure::StatusCheck(_) | JobFailure::PollLimit(_) => STATUS_CHECK_FAILED.to_string(),
            JobFailure::RateLimited => RATE_LIMITED.to_string(),
        }
    }

    /// Convert a poll-time [`ClientError`] into the failure recorded on the job.
    pub fn from_poll_error(err: &ClientError) -> Self {
        match err {
            ClientError::RateLimited { .. } => JobFailure::RateLimited,
            other => JobFailure::StatusCheck(other.to_string()),
        }
    }
}
