//! HTTP client for the PDFsimple job API.
//!
//! [`JobClient`] wraps the service's endpoints:
//!
//! ```text
//! POST /jobs          multipart tool + params + files  → { job_id, status }
//! POST /jobs/batch    same body, one job per file      → [{ job_id, status, filename, error? }]
//! GET  /jobs/{id}                                      → { status, output?, error? }
//! GET  /jobs/{id}/result                               → binary artifact
//! GET  /health                                         → { status: "ok" }
//! ```
//!
//! Submission and single status queries are one request each. [`JobClient::poll`]
//! repeats status queries at a fixed cadence until the job is terminal, its
//! token is cancelled, or an error stops it. Each call to `poll` is an
//! independent chain that owns its `Job`, so batch items never share state.

use crate::config::ClientConfig;
use crate::error::{ClientError, JobFailure};
use crate::job::{BatchJob, Job, JobStatus, PollDecision, SubmitMode, Submission};
use crate::output::{BatchItemResponse, HealthResponse, StatusReport, SubmitResponse};
use crate::progress::ProgressCallback;
use crate::tool::{Tool, ToolParams};
use crate::upload::UploadFile;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything needed for one submission.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub tool: Tool,
    pub params: ToolParams,
    pub files: Vec<UploadFile>,
}

impl JobRequest {
    /// A request with the tool's default parameters.
    pub fn new(tool: Tool, files: Vec<UploadFile>) -> Self {
        Self {
            tool,
            params: ToolParams::default_for(tool),
            files,
        }
    }

    pub fn with_params(mut self, params: ToolParams) -> Self {
        self.params = params;
        self
    }

    /// Endpoint this request will be sent to.
    pub fn mode(&self) -> SubmitMode {
        SubmitMode::for_request(self.tool, self.files.len())
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.files.is_empty() {
            return Err(ClientError::NoFiles);
        }
        if self.params.tool() != self.tool {
            return Err(ClientError::ParamsMismatch {
                tool: self.tool.to_string(),
                params: self.params.tool().to_string(),
            });
        }
        Ok(())
    }

    fn to_form(&self) -> reqwest::multipart::Form {
        let mut form = reqwest::multipart::Form::new()
            .text("tool", self.tool.as_str())
            .text("params", self.params.to_json().to_string());
        for file in &self.files {
            form = form.part("files", file.to_part());
        }
        form
    }
}

/// A result file written to disk by [`JobClient::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedResult {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Async client for one PDFsimple service.
///
/// Cheap to clone: the underlying connection pools are shared.
#[derive(Clone)]
pub struct JobClient {
    http: reqwest::Client,
    download_http: reqwest::Client,
    config: Arc<ClientConfig>,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for JobClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobClient")
            .field("config", &self.config)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn JobProgressCallback>"))
            .finish()
    }
}

impl JobClient {
    /// Build a client for `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let user_agent = concat!("pdfsimple-client/", env!("CARGO_PKG_VERSION"));
        let build = |timeout_secs: u64| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .user_agent(user_agent)
                .build()
                .map_err(|e| ClientError::InvalidConfig(format!("HTTP client: {e}")))
        };
        Ok(Self {
            http: build(config.request_timeout_secs)?,
            download_http: build(config.download_timeout_secs)?,
            config: Arc::new(config),
            progress: None,
        })
    }

    /// A client configured from `PDFSIMPLE_API_URL`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Attach a progress callback. Replaces any previous one.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub(crate) fn progress(&self) -> Option<&ProgressCallback> {
        self.progress.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Download reference for a job's artifact.
    pub fn result_url(&self, job_id: &str) -> String {
        self.config.endpoint(&format!("/jobs/{job_id}/result"))
    }

    /// Poll cadence for jobs of the given submission mode.
    pub fn cadence(&self, mode: SubmitMode) -> Duration {
        match mode {
            SubmitMode::Single => self.config.single_cadence(),
            SubmitMode::Batch => self.config.batch_cadence(),
        }
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Upload files and create one job, or one job per file for a batch.
    ///
    /// Several files with any tool other than merge go to `/jobs/batch`;
    /// everything else goes to `/jobs`. Jobs the service refuses at upload
    /// time (quota, unsupported tool) come back already `failed`.
    ///
    /// # Errors
    /// - [`ClientError::NoFiles`] / [`ClientError::ParamsMismatch`] before any I/O
    /// - [`ClientError::RateLimited`] on HTTP 429
    /// - [`ClientError::Transport`] / [`ClientError::Http`] / [`ClientError::Decode`]
    pub async fn submit(&self, request: &JobRequest) -> Result<Submission, ClientError> {
        request.validate()?;
        let mode = request.mode();
        let path = match mode {
            SubmitMode::Single => "/jobs",
            SubmitMode::Batch => "/jobs/batch",
        };
        let url = self.config.endpoint(path);
        let total_bytes: usize = request.files.iter().map(UploadFile::len).sum();
        info!(
            tool = %request.tool,
            files = request.files.len(),
            bytes = total_bytes,
            ?mode,
            "Submitting job"
        );

        let response = self
            .http
            .post(&url)
            .multipart(request.to_form())
            .send()
            .await
            .map_err(|e| transport(&url, e))?;
        let response = check_response(response, &url).await?;

        let submission = match mode {
            SubmitMode::Single => {
                let body: SubmitResponse = decode(response, &url).await?;
                Submission::Single(single_job(request.tool, body))
            }
            SubmitMode::Batch => {
                let items: Vec<BatchItemResponse> = decode(response, &url).await?;
                Submission::Batch(batch_jobs(request.tool, items, &request.files))
            }
        };

        for job in submission.jobs() {
            match job.id.as_deref() {
                Some(id) if !job.is_terminal() => debug!(job_id = id, "Job accepted"),
                id => warn!(
                    job_id = id.unwrap_or("-"),
                    filename = job.filename.as_deref().unwrap_or("-"),
                    error = %job.error_message().unwrap_or_default(),
                    "Job refused at submission"
                ),
            }
        }
        if let Some(cb) = self.progress() {
            let jobs: Vec<Job> = submission.jobs().into_iter().cloned().collect();
            cb.on_submitted(mode, &jobs);
        }
        Ok(submission)
    }

    // ── Status ───────────────────────────────────────────────────────────

    /// One `GET /jobs/{id}`.
    pub async fn check_status(&self, job_id: &str) -> Result<StatusReport, ClientError> {
        let url = self.config.endpoint(&format!("/jobs/{job_id}"));
        let response = self.http.get(&url).send().await.map_err(|e| transport(&url, e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::JobNotFound {
                job_id: job_id.to_string(),
            });
        }
        let response = check_response(response, &url).await?;
        decode(response, &url).await
    }

    /// Query the job's status every `cadence` until it settles.
    ///
    /// The chain ends when:
    /// - the service reports `completed` (result URL and metrics filled in);
    /// - the service reports `failed` (failure recorded);
    /// - a status query errors (recorded as [`JobFailure::StatusCheck`],
    ///   or [`JobFailure::RateLimited`] on HTTP 429), with no retry;
    /// - `max_polls` queries were made ([`JobFailure::PollLimit`]);
    /// - `cancel` fires. The job comes back unchanged and unsettled.
    ///
    /// Queries for one job never overlap: the next one starts only after the
    /// previous response and the cadence delay.
    pub async fn poll(&self, mut job: Job, cadence: Duration, cancel: &CancellationToken) -> Job {
        let Some(job_id) = job.id.clone() else {
            return job;
        };
        if job.is_settled() {
            return job;
        }

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let report = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(job_id = %job_id, "Polling cancelled");
                    return job;
                }
                r = self.check_status(&job_id) => r,
            };

            match report {
                Ok(report) => {
                    let before = job.status;
                    let decision = job.observe(&report, &self.config.base_url);
                    debug!(job_id = %job_id, attempt = attempts, status = %job.status, "Polled");
                    if decision == PollDecision::Stop {
                        self.notify_settled(&job);
                        return job;
                    }
                    if job.status != before {
                        if let Some(cb) = self.progress() {
                            cb.on_status(&job);
                        }
                    }
                }
                Err(e) => {
                    warn!(job_id = %job_id, attempt = attempts, "Status check failed: {e}");
                    job.failure = Some(JobFailure::from_poll_error(&e));
                    self.notify_settled(&job);
                    return job;
                }
            }

            if let Some(max) = self.config.max_polls {
                if attempts >= max {
                    warn!(job_id = %job_id, attempts, "Giving up on job");
                    job.failure = Some(JobFailure::PollLimit(attempts));
                    self.notify_settled(&job);
                    return job;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(job_id = %job_id, "Polling cancelled");
                    return job;
                }
                _ = tokio::time::sleep(cadence) => {}
            }
        }
    }

    fn notify_settled(&self, job: &Job) {
        let id = job.id.as_deref().unwrap_or("-");
        match (&job.status, &job.failure) {
            (JobStatus::Completed, _) => {
                info!(job_id = id, "Job completed");
                if let Some(cb) = self.progress() {
                    cb.on_job_complete(job);
                }
            }
            (_, Some(failure)) => {
                warn!(job_id = id, "Job failed: {failure}");
                if let Some(cb) = self.progress() {
                    cb.on_job_failed(job, &failure.message());
                }
            }
            _ => {}
        }
    }

    // ── Results ──────────────────────────────────────────────────────────

    /// Fetch a completed job's artifact into `dest`.
    ///
    /// When `dest` is an existing directory the file name comes from the
    /// response's `Content-Disposition`, falling back to `<job_id>.bin`.
    /// The body is streamed into a temporary file beside the destination
    /// and renamed into place, so a failed download never leaves a partial
    /// file at `dest`.
    pub async fn download(&self, job_id: &str, dest: impl AsRef<Path>) -> Result<DownloadedResult, ClientError> {
        self.fetch_result(job_id, dest.as_ref(), None).await
    }

    /// Fetch one job of a batch into the directory `dir`.
    ///
    /// The service often names every artifact of a tool the same way
    /// (`watermarked.pdf`), so the saved name is prefixed with the stem of
    /// the job's input file (or its id) and never replaces an existing
    /// file: a taken name gets a `-1`, `-2`, … suffix.
    pub async fn download_job_into(&self, job: &Job, dir: impl AsRef<Path>) -> Result<DownloadedResult, ClientError> {
        let job_id = job.id.as_deref().ok_or_else(|| ClientError::ResultNotAvailable {
            job_id: job.filename.clone().unwrap_or_default(),
        })?;
        let prefix = job
            .filename
            .as_deref()
            .and_then(|f| Path::new(f).file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| job_id.to_string());
        self.fetch_result(job_id, dir.as_ref(), Some(&prefix)).await
    }

    /// With a `prefix`, `dest` is always a directory and existing files are kept.
    async fn fetch_result(
        &self,
        job_id: &str,
        dest: &Path,
        prefix: Option<&str>,
    ) -> Result<DownloadedResult, ClientError> {
        let url = self.result_url(job_id);
        info!(job_id, "Downloading result");
        let response = self
            .download_http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::ResultNotAvailable {
                job_id: job_id.to_string(),
            });
        }
        let response = check_response(response, &url).await?;

        let into_dir = match prefix {
            Some(_) => true,
            None => tokio::fs::metadata(dest).await.map(|m| m.is_dir()).unwrap_or(false),
        };
        let path = if into_dir {
            let name = response
                .headers()
                .get(reqwest::header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .and_then(filename_from_disposition)
                .unwrap_or_else(|| format!("{job_id}.bin"));
            match prefix {
                Some(prefix) => dest.join(format!("{prefix}_{name}")),
                None => dest.join(name),
            }
        } else {
            dest.to_path_buf()
        };

        let write_err = |source: std::io::Error| ClientError::OutputWriteFailed {
            path: path.clone(),
            source,
        };
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent).await.map_err(write_err)?;

        let tmp = tempfile::Builder::new()
            .prefix(".pdfsimple-")
            .tempfile_in(&parent)
            .map_err(write_err)?;
        let (std_file, tmp_path) = tmp.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| transport(&url, e))?;
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;
        drop(file);

        let path = if prefix.is_some() {
            persist_unique(tmp_path, &path).map_err(write_err)?
        } else {
            tmp_path.persist(&path).map_err(|e| write_err(e.error))?;
            path.clone()
        };
        info!(job_id, bytes = written, path = %path.display(), "Result saved");
        Ok(DownloadedResult { path, bytes: written })
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.config.endpoint("/health");
        let response = self.http.get(&url).send().await.map_err(|e| transport(&url, e))?;
        let response = check_response(response, &url).await?;
        let health: HealthResponse = decode(response, &url).await?;
        if health.status != "ok" {
            return Err(ClientError::Http {
                status: 200,
                detail: format!("service reports status '{}'", health.status),
            });
        }
        Ok(health)
    }
}

// ── Response mapping ─────────────────────────────────────────────────────

fn single_job(tool: Tool, body: SubmitResponse) -> Job {
    match (body.job_id, body.status) {
        (Some(id), Some(JobStatus::Failed)) => Job::rejected(tool, Some(id), body.error),
        (Some(id), status) => Job::accepted(tool, id, status.unwrap_or(JobStatus::Queued)),
        (None, _) => Job::rejected(tool, None, body.error),
    }
}

fn batch_jobs(tool: Tool, items: Vec<BatchItemResponse>, files: &[UploadFile]) -> BatchJob {
    let jobs = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            // The service omits `filename` on some failure items; upload order matches.
            let filename = item
                .filename
                .or_else(|| files.get(i).map(|f| f.filename.clone()));
            let job = match (item.job_id, item.status) {
                (Some(id), status) if status != JobStatus::Failed => Job::accepted(tool, id, status),
                (id, _) => Job::rejected(tool, id, item.error),
            };
            job.with_filename(filename)
        })
        .collect();
    BatchJob::new(tool, jobs)
}

fn transport(url: &str, e: reqwest::Error) -> ClientError {
    let reason = if e.is_timeout() {
        format!("timed out: {e}")
    } else {
        e.to_string()
    };
    ClientError::Transport {
        url: url.to_string(),
        reason,
    }
}

/// Map 429 and other non-success statuses to errors; pass successes through.
async fn check_response(response: reqwest::Response, url: &str) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        warn!(url, ?retry_after_secs, "Rate limited");
        return Err(ClientError::RateLimited { retry_after_secs });
    }
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Http {
        status: status.as_u16(),
        detail: error_detail(&body),
    })
}

/// FastAPI wraps errors as `{"detail": "..."}`; fall back to the raw body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => match v.get("detail").or_else(|| v.get("error")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.trim().to_string(),
        },
        Err(_) => body.trim().to_string(),
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T, ClientError> {
    let bytes = response.bytes().await.map_err(|e| transport(url, e))?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
        url: url.to_string(),
        detail: e.to_string(),
    })
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// Prefers RFC 5987 `filename*=` over plain `filename=`, and strips any
/// directory components so the result is safe to join onto a directory.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in value.split(';').map(str::trim) {
        if let Some(v) = param.strip_prefix("filename*=") {
            // charset'lang'percent-encoded
            let encoded = v.splitn(3, '\'').nth(2).unwrap_or(v);
            // Bytes that are not UTF-8 leave only the plain name usable.
            extended = urlencoding::decode(encoded).ok().map(|name| name.into_owned());
        } else if let Some(v) = param.strip_prefix("filename=") {
            plain = Some(v.trim_matches('"').to_string());
        }
    }
    let name = extended.or(plain)?;
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim().to_string();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base)
    }
}

/// Move `tmp` to `wanted`, or to the first free `stem-N.ext` beside it.
fn persist_unique(mut tmp: tempfile::TempPath, wanted: &Path) -> std::io::Result<PathBuf> {
    for n in 0..1000u32 {
        let candidate = numbered(wanted, n);
        match tmp.persist_noclobber(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => tmp = e.path,
            Err(e) => return Err(e.error),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        "no free file name left",
    ))
}

fn numbered(path: &Path, n: u32) -> PathBuf {
    if n == 0 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{n}"),
    };
    path.with_file_name(name)
}
