//! # pdfsimple-client
//!
//! Async client for the PDFsimple document-processing service: submit one
//! or more files with a tool and its parameters, poll the resulting job(s)
//! until they settle, and fetch the result.
//!
//! ## Job Lifecycle
//!
//! ```text
//! files + tool + params
//!  │
//!  ├─ 1. Submit   one multipart POST: /jobs (single) or /jobs/batch (one job per file)
//!  ├─ 2. Poll     GET /jobs/{id} per job, 1 s cadence (2 s for batch items)
//!  ├─ 3. Settle   completed → result reference (+ compression metrics)
//!  │              failed    → error recorded on that job only
//!  └─ 4. Fetch    GET /jobs/{id}/result, streamed to disk atomically
//! ```
//!
//! Status only moves forward: `uploading → submitted → queued → processing →
//! completed | failed`. Several files with any tool other than `merge` become
//! a batch; each batch item is polled by its own cancellable task.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfsimple_client::{watch_all, JobClient, JobRequest, Tool, ToolParams, UploadFile};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Base URL from PDFSIMPLE_API_URL, default http://localhost:8000
//!     let client = JobClient::from_env()?;
//!     let file = UploadFile::from_path("report.pdf").await?;
//!     let params = ToolParams::from_json(Tool::Compress, serde_json::json!({"level": "high"}))?;
//!     let request = JobRequest::new(Tool::Compress, vec![file]).with_params(params);
//!
//!     let submission = client.submit(&request).await?;
//!     for job in watch_all(&client, submission, &CancellationToken::new()).await {
//!         match (job.error_message(), job.compression) {
//!             (Some(e), _) => eprintln!("failed: {e}"),
//!             (None, Some(stats)) => println!("{} ({})", job.result_url.unwrap_or_default(), stats.change()),
//!             (None, None) => println!("{}", job.result_url.unwrap_or_default()),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsimple` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfsimple-client = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing an API
//!
//! | API | Use when |
//! |-----|----------|
//! | [`JobClient::submit`] + [`JobClient::poll`] | you drive each job yourself |
//! | [`watch_stream`] / [`watch_all`] | you want every job of a submission settled, concurrently |
//! | [`Session`] | a front end keeps a tool selection and shows live state |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod output;
pub mod progress;
pub mod session;
pub mod stream;
pub mod tool;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{filename_from_disposition, DownloadedResult, JobClient, JobRequest};
pub use config::{ClientConfig, ClientConfigBuilder, API_URL_ENV, DEFAULT_API_URL};
pub use error::{ClientError, JobFailure};
pub use job::{BatchJob, Job, JobStatus, PollDecision, SubmitMode, Submission};
pub use output::{CompressionStats, HealthResponse, SizeChange, StatusReport};
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{JobEvent, Session, SessionState};
pub use stream::{watch_all, watch_stream, JobStream};
pub use tool::{catalog, Tool, ToolDescriptor, ToolParams};
pub use upload::UploadFile;
