//! Streaming watch API: emit jobs as they settle.
//!
//! [`watch_stream`] turns a [`Submission`] into a `Stream` of [`Job`]s. Each
//! job gets its own poll chain; the stream yields a job as soon as its chain
//! ends, so a batch of ten files reports the fast items first instead of
//! waiting for the slowest. Sort by position in the original submission if
//! order matters.
//!
//! Dropping the stream drops every pending chain. Cancelling `cancel` ends
//! them early; those jobs are yielded unsettled.

use crate::client::JobClient;
use crate::job::{Job, Submission};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A boxed stream of settled (or cancelled) jobs.
pub type JobStream = Pin<Box<dyn Stream<Item = Job> + Send>>;

/// Poll every job in `submission` concurrently, yielding each as it settles.
///
/// Jobs that are already settled (refused at submission) are yielded
/// without any request. Batch items use the batch cadence.
///
/// # Example
/// ```rust,no_run
/// use pdfsimple_client::{watch_stream, JobClient, JobRequest, Tool, UploadFile};
/// use futures::StreamExt;
/// use std::path::PathBuf;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = JobClient::from_env()?;
/// let files = UploadFile::from_paths(&[PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]).await?;
/// let submission = client.submit(&JobRequest::new(Tool::Compress, files)).await?;
///
/// let mut jobs = watch_stream(client, submission, CancellationToken::new());
/// while let Some(job) = jobs.next().await {
///     match job.error_message() {
///         None => println!("{:?} → {:?}", job.filename, job.result_url),
///         Some(e) => eprintln!("{:?} failed: {e}", job.filename),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn watch_stream(client: JobClient, submission: Submission, cancel: CancellationToken) -> JobStream {
    let cadence = client.cadence(submission.mode());
    let jobs = submission.into_jobs();
    let width = jobs.len().max(1);
    info!(jobs = jobs.len(), cadence_ms = cadence.as_millis() as u64, "Watching jobs");

    let s = stream::iter(jobs.into_iter().map(move |job| {
        let client = client.clone();
        let cancel = cancel.child_token();
        async move { client.poll(job, cadence, &cancel).await }
    }))
    .buffer_unordered(width);

    Box::pin(s)
}

/// Poll every job and collect them back in submission order.
pub async fn watch_all(client: &JobClient, submission: Submission, cancel: &CancellationToken) -> Vec<Job> {
    let cadence = client.cadence(submission.mode());
    let jobs = submission.into_jobs();
    let width = jobs.len().max(1);
    stream::iter(jobs.into_iter().map(|job| {
        let cancel = cancel.child_token();
        async move { client.poll(job, cadence, &cancel).await }
    }))
    .buffered(width)
    .collect()
    .await
}
