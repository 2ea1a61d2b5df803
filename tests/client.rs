//! Integration tests for pdfsimple-client against a mock PDFsimple service.
//!
//! Every test starts its own `wiremock` server, so they run in parallel and
//! need no network access. Poll cadences are shortened to a few milliseconds.
//!
//! Run with:
//!   cargo test --test client

use pdfsimple_client::error::{RATE_LIMITED, STATUS_CHECK_FAILED, UPLOAD_FAILED};
use pdfsimple_client::{
    watch_all, watch_stream, ClientConfig, ClientError, Job, JobClient, JobFailure, JobRequest, JobStatus, Session,
    SizeChange, Submission, SubmitMode, Tool, ToolParams, UploadFile,
};
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn client_for(server: &MockServer) -> JobClient {
    client_with(server, None)
}

fn client_with(server: &MockServer, max_polls: Option<u32>) -> JobClient {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .poll_interval_ms(10)
        .batch_poll_interval_ms(10)
        .max_polls(max_polls)
        .build()
        .expect("valid test config");
    JobClient::new(config).expect("client builds")
}

fn pdf(name: &str) -> UploadFile {
    UploadFile::from_bytes(name, b"%PDF-1.4 test".to_vec())
}

async fn status_requests(server: &MockServer, job_id: &str) -> usize {
    let wanted = format!("/jobs/{job_id}");
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET" && r.url.path() == wanted)
        .count()
}

/// Mount `processing` for the first `n` status queries, then `last`.
async fn mount_status_sequence(server: &MockServer, job_id: &str, n: u64, last: serde_json::Value) {
    if n > 0 {
        Mock::given(method("GET"))
            .and(path(format!("/jobs/{job_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job_id": job_id,
                "status": "processing"
            })))
            .up_to_n_times(n)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(format!("/jobs/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(last))
        .mount(server)
        .await;
}

// ── Submission ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_file_goes_to_jobs_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .and(body_string_contains("compress"))
        .and(body_string_contains(r#""level":"high""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "j1", "status": "queued"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/jobs/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let params = ToolParams::from_json(Tool::Compress, json!({"level": "high"})).unwrap();
    let request = JobRequest::new(Tool::Compress, vec![pdf("a.pdf")]).with_params(params);
    let submission = client_for(&server).submit(&request).await.unwrap();

    assert_eq!(submission.mode(), SubmitMode::Single);
    let jobs = submission.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id.as_deref(), Some("j1"));
    assert_eq!(jobs[0].status, JobStatus::Queued);
}

#[tokio::test]
async fn merge_of_many_files_is_one_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "m1", "status": "queued"})))
        .expect(1)
        .mount(&server)
        .await;

    let files = vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")];
    let submission = client_for(&server)
        .submit(&JobRequest::new(Tool::Merge, files))
        .await
        .unwrap();

    assert!(matches!(submission, Submission::Single(_)));
}

#[tokio::test]
async fn several_files_become_a_batch_with_isolated_refusals() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"job_id": "b1", "status": "queued", "filename": "a.pdf"},
            {"job_id": null, "status": "failed", "filename": "b.pdf", "error": "Quota exceeded"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let submission = client_for(&server)
        .submit(&JobRequest::new(Tool::Watermark, vec![pdf("a.pdf"), pdf("b.pdf")]))
        .await
        .unwrap();

    let Submission::Batch(batch) = submission else {
        panic!("expected a batch submission");
    };
    assert_eq!(batch.items.len(), 2);
    assert_eq!(batch.items[0].status, JobStatus::Queued);
    assert!(batch.items[0].failure.is_none());
    assert_eq!(batch.items[1].status, JobStatus::Failed);
    assert_eq!(batch.items[1].filename.as_deref(), Some("b.pdf"));
    assert_eq!(batch.items[1].error_message().as_deref(), Some("Quota exceeded"));
}

#[tokio::test]
async fn quota_refusal_on_single_submit_is_already_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "failed", "error": "Daily quota exceeded"})),
        )
        .mount(&server)
        .await;

    let submission = client_for(&server)
        .submit(&JobRequest::new(Tool::Ocr, vec![pdf("scan.pdf")]))
        .await
        .unwrap();

    let job = &submission.jobs()[0];
    assert!(job.id.is_none());
    assert!(job.is_settled());
    assert_eq!(job.error_message().as_deref(), Some("Daily quota exceeded"));
}

#[tokio::test]
async fn rate_limit_is_reported_distinctly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&JobRequest::new(Tool::Split, vec![pdf("a.pdf")]))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::RateLimited { retry_after_secs: Some(30) }));
    assert_eq!(err.user_message(), RATE_LIMITED);
    assert_ne!(err.user_message(), UPLOAD_FAILED);
}

#[tokio::test]
async fn unreachable_service_is_upload_failed() {
    let config = ClientConfig::builder()
        .base_url("http://127.0.0.1:9")
        .build()
        .unwrap();
    let err = JobClient::new(config)
        .unwrap()
        .submit(&JobRequest::new(Tool::Split, vec![pdf("a.pdf")]))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(err.user_message(), UPLOAD_FAILED);
}

#[tokio::test]
async fn service_rejection_carries_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Unsupported tool: frobnicate"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&JobRequest::new(Tool::Rotate, vec![pdf("a.pdf")]))
        .await
        .unwrap_err();

    match err {
        ClientError::Http { status, ref detail } => {
            assert_eq!(status, 400);
            assert_eq!(detail, "Unsupported tool: frobnicate");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn submit_without_files_makes_no_request() {
    let server = MockServer::start().await;
    let err = client_for(&server)
        .submit(&JobRequest::new(Tool::Compress, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NoFiles));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

// ── Polling ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn poll_continues_until_completed_and_derives_metrics() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        "j1",
        2,
        json!({
            "job_id": "j1",
            "status": "completed",
            "output": {"original_size": 1000, "compressed_size": 400}
        }),
    )
    .await;

    let client = client_for(&server);
    let job = Job::accepted(Tool::Compress, "j1", JobStatus::Queued);
    let job = client
        .poll(job, Duration::from_millis(10), &CancellationToken::new())
        .await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result_url, Some(format!("{}/jobs/j1/result", server.uri())));
    let stats = job.compression.expect("compression metrics");
    assert_eq!(stats.saved_percent(), 60.0);
    assert_eq!(stats.change(), SizeChange::Saved { percent: 60.0 });
    assert_eq!(status_requests(&server, "j1").await, 3);
}

#[tokio::test]
async fn larger_output_is_labelled_as_increase() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        "j2",
        0,
        json!({
            "job_id": "j2",
            "status": "completed",
            "output": {"original_size": 1000, "compressed_size": 1200}
        }),
    )
    .await;

    let client = client_for(&server);
    let job = Job::accepted(Tool::Compress, "j2", JobStatus::Queued);
    let job = client
        .poll(job, Duration::from_millis(10), &CancellationToken::new())
        .await;

    let change = job.compression.expect("metrics").change();
    assert!(matches!(change, SizeChange::Increased { .. }));
    assert!(change.to_string().contains("increased"));
}

#[tokio::test]
async fn failed_job_records_service_error() {
    let server = MockServer::start().await;
    mount_status_sequence(
        &server,
        "j3",
        1,
        json!({"job_id": "j3", "status": "failed", "error": "Corrupt PDF"}),
    )
    .await;

    let client = client_for(&server);
    let job = Job::accepted(Tool::Split, "j3", JobStatus::Queued);
    let job = client
        .poll(job, Duration::from_millis(10), &CancellationToken::new())
        .await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.failure, Some(JobFailure::Service("Corrupt PDF".into())));
    assert!(job.result_url.is_none());
}

#[tokio::test]
async fn status_error_stops_polling_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/j4"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let job = Job::accepted(Tool::Split, "j4", JobStatus::Queued);
    let job = client
        .poll(job, Duration::from_millis(10), &CancellationToken::new())
        .await;

    assert!(matches!(job.failure, Some(JobFailure::StatusCheck(_))));
    assert_eq!(job.error_message().as_deref(), Some(STATUS_CHECK_FAILED));
    assert_ne!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn poll_cap_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/j5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "j5", "status": "processing"})))
        .mount(&server)
        .await;

    let client = client_with(&server, Some(3));
    let job = Job::accepted(Tool::Split, "j5", JobStatus::Queued);
    let job = client
        .poll(job, Duration::from_millis(5), &CancellationToken::new())
        .await;

    assert_eq!(job.failure, Some(JobFailure::PollLimit(3)));
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(status_requests(&server, "j5").await, 3);
}

#[tokio::test]
async fn cancelled_token_makes_no_request() {
    let server = MockServer::start().await;
    let token = CancellationToken::new();
    token.cancel();

    let job = Job::accepted(Tool::Split, "j6", JobStatus::Queued);
    let job = client_for(&server)
        .poll(job, Duration::from_millis(10), &token)
        .await;

    assert_eq!(job.status, JobStatus::Queued);
    assert!(!job.is_settled());
    assert_eq!(status_requests(&server, "j6").await, 0);
}

#[tokio::test]
async fn watch_all_keeps_batch_items_independent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"job_id": "a", "status": "queued", "filename": "a.pdf"},
            {"job_id": "b", "status": "queued", "filename": "b.pdf"}
        ])))
        .mount(&server)
        .await;
    mount_status_sequence(&server, "a", 1, json!({"job_id": "a", "status": "completed", "output": {}})).await;
    mount_status_sequence(
        &server,
        "b",
        0,
        json!({"job_id": "b", "status": "failed", "error": "Password protected"}),
    )
    .await;

    let client = client_for(&server);
    let submission = client
        .submit(&JobRequest::new(Tool::Compress, vec![pdf("a.pdf"), pdf("b.pdf")]))
        .await
        .unwrap();
    let jobs = watch_all(&client, submission, &CancellationToken::new()).await;

    assert_eq!(jobs[0].id.as_deref(), Some("a"));
    assert_eq!(jobs[0].status, JobStatus::Completed);
    assert!(jobs[0].failure.is_none());
    assert_eq!(jobs[1].status, JobStatus::Failed);
    assert_eq!(jobs[1].error_message().as_deref(), Some("Password protected"));
}

#[tokio::test]
async fn watch_stream_yields_every_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"job_id": "s1", "status": "queued"},
            {"job_id": "s2", "status": "queued"},
            {"job_id": null, "status": "failed", "error": "Quota exceeded"}
        ])))
        .mount(&server)
        .await;
    for id in ["s1", "s2"] {
        mount_status_sequence(&server, id, 1, json!({"job_id": id, "status": "completed"})).await;
    }

    let client = client_for(&server);
    let submission = client
        .submit(&JobRequest::new(
            Tool::Rotate,
            vec![pdf("1.pdf"), pdf("2.pdf"), pdf("3.pdf")],
        ))
        .await
        .unwrap();
    let jobs: Vec<_> = watch_stream(client, submission, CancellationToken::new())
        .collect()
        .await;

    assert_eq!(jobs.len(), 3);
    assert_eq!(jobs.iter().filter(|j| j.status == JobStatus::Completed).count(), 2);
    assert_eq!(jobs.iter().filter(|j| j.failure.is_some()).count(), 1);
}

// ── Results & health ─────────────────────────────────────────────────────────

#[tokio::test]
async fn download_into_directory_uses_disposition_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/j1/result"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", r#"attachment; filename="compressed.pdf""#)
                .set_body_bytes(b"%PDF-1.7 result".to_vec()),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let saved = client_for(&server).download("j1", dir.path()).await.unwrap();

    assert_eq!(saved.path, dir.path().join("compressed.pdf"));
    assert_eq!(saved.bytes, 15);
    assert_eq!(std::fs::read(&saved.path).unwrap(), b"%PDF-1.7 result");
}

#[tokio::test]
async fn batch_results_sharing_a_name_are_all_kept() {
    let server = MockServer::start().await;
    for (id, body) in [("a", "result of a"), ("b", "result of b")] {
        Mock::given(method("GET"))
            .and(path(format!("/jobs/{id}/result")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Disposition", r#"attachment; filename="watermarked.pdf""#)
                    .set_body_bytes(body.as_bytes().to_vec()),
            )
            .mount(&server)
            .await;
    }
    let client = client_for(&server);
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a_watermarked.pdf"), b"from an earlier run").unwrap();

    let completed = |id: &str, file: &str| {
        let mut job = Job::accepted(Tool::Watermark, id, JobStatus::Processing);
        job.status = JobStatus::Completed;
        job.filename = Some(file.to_string());
        job
    };
    let first = completed("a", "a.pdf");
    let second = completed("b", "b.pdf");
    // Same input stem as `first`.
    let third = completed("a", "a.pdf");

    let a = client.download_job_into(&first, dir.path()).await.unwrap();
    let b = client.download_job_into(&second, dir.path()).await.unwrap();
    let again = client.download_job_into(&third, dir.path()).await.unwrap();

    assert_eq!(a.path, dir.path().join("a_watermarked-1.pdf"));
    assert_eq!(b.path, dir.path().join("b_watermarked.pdf"));
    assert_eq!(again.path, dir.path().join("a_watermarked-2.pdf"));
    assert_eq!(std::fs::read(&a.path).unwrap(), b"result of a");
    assert_eq!(std::fs::read(&b.path).unwrap(), b"result of b");
    assert_eq!(
        std::fs::read(dir.path().join("a_watermarked.pdf")).unwrap(),
        b"from an earlier run"
    );
}

#[tokio::test]
async fn download_of_missing_result_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/nope/result"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.pdf");
    let err = client_for(&server).download("nope", &dest).await.unwrap_err();

    assert!(matches!(err, ClientError::ResultNotAvailable { .. }));
    assert!(!dest.exists());
}

#[tokio::test]
async fn unknown_job_status_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Job not found"})))
        .mount(&server)
        .await;

    let err = client_for(&server).check_status("ghost").await.unwrap_err();
    assert!(matches!(err, ClientError::JobNotFound { .. }));
}

#[tokio::test]
async fn health_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let health = tokio_test::assert_ok!(client_for(&server).health().await);
    assert_eq!(health.status, "ok");
}

// ── Session ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_runs_single_job_to_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "s1", "status": "queued"})))
        .mount(&server)
        .await;
    mount_status_sequence(
        &server,
        "s1",
        1,
        json!({
            "job_id": "s1",
            "status": "completed",
            "output": {"original_size": 1000, "compressed_size": 400}
        }),
    )
    .await;

    let mut session = Session::new(client_for(&server), Tool::Compress);
    session.add_file(pdf("a.pdf"));
    assert!(session.can_submit());
    session.start().await.unwrap();
    let state = session.wait().await.clone();

    assert_eq!(state.mode, Some(SubmitMode::Single));
    assert_eq!(state.job_id.as_deref(), Some("s1"));
    assert_eq!(state.status, Some(JobStatus::Completed));
    assert_eq!(state.download_url, Some(format!("{}/jobs/s1/result", server.uri())));
    assert_eq!(state.compression.map(|c| c.saved_percent()), Some(60.0));
    assert!(state.error.is_none());
    assert!(!session.is_running());
}

#[tokio::test]
async fn session_batch_items_settle_independently() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"job_id": "a", "status": "queued", "filename": "a.pdf"},
            {"job_id": "b", "status": "queued", "filename": "b.pdf"}
        ])))
        .mount(&server)
        .await;
    mount_status_sequence(&server, "a", 2, json!({"job_id": "a", "status": "completed"})).await;
    mount_status_sequence(&server, "b", 0, json!({"job_id": "b", "status": "failed", "error": "Bad file"})).await;

    let mut session = Session::new(client_for(&server), Tool::PageNumbers);
    session.set_files(vec![pdf("a.pdf"), pdf("b.pdf")]);
    session.start().await.unwrap();
    let state = session.wait().await.clone();

    assert_eq!(state.mode, Some(SubmitMode::Batch));
    assert!(state.status.is_none());
    assert_eq!(state.batch[0].status, JobStatus::Completed);
    assert_eq!(state.batch[1].status, JobStatus::Failed);
    assert_eq!(state.batch[1].error_message().as_deref(), Some("Bad file"));
    assert!(state.error.is_none());
}

#[tokio::test]
async fn session_rate_limit_sets_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let mut session = Session::new(client_for(&server), Tool::Split);
    session.add_file(pdf("a.pdf"));
    assert!(session.start().await.is_err());
    assert_eq!(session.state().error.as_deref(), Some(RATE_LIMITED));
}

#[tokio::test]
async fn reselecting_tool_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "long", "status": "queued"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/long"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "long", "status": "processing"})))
        .mount(&server)
        .await;

    let mut session = Session::new(client_for(&server), Tool::Ocr);
    session.add_file(pdf("scan.pdf"));
    session.start().await.unwrap();
    // Let the chain observe `processing` at least once.
    let event = session.next_event().await.expect("a status event");
    assert_eq!(event.job().status, JobStatus::Processing);

    session.select_tool(Tool::Compress);
    assert!(session.state().job_id.is_none());
    assert!(session.files().is_empty());
    assert!(!session.is_running());

    tokio::time::sleep(Duration::from_millis(30)).await;
    let before = status_requests(&server, "long").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(status_requests(&server, "long").await, before);
}

#[tokio::test]
async fn session_shows_immediate_refusal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "failed", "error": "Quota exceeded"})),
        )
        .mount(&server)
        .await;

    let mut session = Session::new(client_for(&server), Tool::Protect);
    session.add_file(pdf("secret.pdf"));
    session.start().await.unwrap();

    assert!(session.is_settled());
    assert!(!session.is_running());
    let state = session.wait().await;
    assert_eq!(state.status, Some(JobStatus::Failed));
    assert_eq!(state.error.as_deref(), Some("Quota exceeded"));
    assert!(state.download_url.is_none());
}

#[tokio::test]
async fn cancelling_session_stops_requests_and_keeps_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "slow", "status": "queued"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "slow", "status": "processing"})))
        .mount(&server)
        .await;

    let mut session = Session::new(client_for(&server), Tool::Ocr);
    session.add_file(pdf("scan.pdf"));
    session.start().await.unwrap();
    let event = session.next_event().await.expect("a status event");
    assert_eq!(event.job().status, JobStatus::Processing);

    session.cancel();
    assert!(!session.is_running());
    assert_eq!(session.tool(), Tool::Ocr);
    assert_eq!(session.files().len(), 1);
    assert_eq!(session.state().job_id.as_deref(), Some("slow"));
    assert_eq!(session.state().status, Some(JobStatus::Processing));

    let state = tokio::time::timeout(Duration::from_secs(1), session.wait())
        .await
        .expect("wait returns once polling is cancelled");
    assert_eq!(state.status, Some(JobStatus::Processing));

    tokio::time::sleep(Duration::from_millis(30)).await;
    let before = status_requests(&server, "slow").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(status_requests(&server, "slow").await, before);
}
