use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobwatch::progress::{ProgressSink, ProgressUpdate, ReportError};
use jobwatch::{HttpSource, JobSource, JobStatus, JobWaiter, Operation, SourceError, WaitConfig, WaitOptions};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingSink {
    values: Mutex<Vec<f64>>,
}

impl RecordingSink {
    fn values(&self) -> Vec<f64> {
        self.values.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, update: ProgressUpdate) -> Result<(), ReportError> {
        self.values.lock().unwrap().push(update.current);
        Ok(())
    }
}

fn envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn source(server: &MockServer) -> Arc<HttpSource> {
    Arc::new(HttpSource::new(server.uri(), "test-key", Duration::from_secs(5)).unwrap())
}

fn fast() -> WaitOptions {
    WaitOptions {
        timeout: Duration::from_secs(10),
        poll_interval: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn test_wait_follows_job_across_a_phase_boundary() {
    let server = MockServer::start().await;

    // Feed history from a previous run: must be skipped
    Mock::given(method("GET"))
        .and(path("/jobs/s1/messages"))
        .and(query_param_is_missing("since_seq"))
        .respond_with(envelope(json!({
            "messages": [{"_seq": 3, "card_id": "tm", "message_data": {"progress": 100}}],
            "last_seq": 3
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/s1/messages"))
        .and(query_param("since_seq", "3"))
        .respond_with(envelope(json!({
            "messages": [{"seq": 4, "data": {"percent": "35"}}],
            "last_seq": 4
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/s1/messages"))
        .and(query_param("since_seq", "4"))
        .respond_with(envelope(json!({ "messages": [], "last_seq": 4 })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/s1"))
        .respond_with(envelope(json!({"status": "processing", "current_step": "Table Making"})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/s1"))
        .respond_with(envelope(json!({"status": "completed", "current_step": "Table Making"})))
        .up_to_n_times(2)
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/s1"))
        .respond_with(envelope(json!({
            "status": "preview_complete",
            "current_step": "Preview",
            "cost_estimate": {"estimated_total_cost_usd": 2.5},
            "config_id": "cfg-7"
        })))
        .with_priority(3)
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::default());
    let waiter = JobWaiter::new(source(&server), sink.clone(), &WaitConfig::default()).with_options(fast());

    let outcome = waiter.wait("s1").await;

    assert!(!outcome.timed_out);
    assert_eq!(outcome.state.job_id.as_deref(), Some("s1"));
    assert_eq!(outcome.state.status, JobStatus::PreviewComplete);
    assert_eq!(outcome.transitions, 1);
    assert_eq!(outcome.guidance.operations(), vec![Operation::ApproveValidation]);
    assert_eq!(outcome.guidance.next_steps[0].parameters["approved_cost_usd"], 2.5);

    let values = sink.values();
    assert!(values[0] < 5.0, "history leaked into first emission: {:?}", values);
    assert!(values.windows(2).all(|w| w[1] >= w[0]), "progress regressed: {:?}", values);
    assert_eq!(values.last(), Some(&100.0));

    let annotated = outcome.to_value();
    assert_eq!(annotated["config_id"], "cfg-7");
    assert_eq!(annotated["_guidance"]["next_steps"][0]["operation"], "approve_validation");
}

#[tokio::test]
async fn test_wait_accepts_snapshots_with_both_wire_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/j1/messages"))
        .respond_with(envelope(json!({
            "messages": [{"_seq": 2, "seq": 2, "message_data": null, "data": {"progress": 50}}],
            "last_seq": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/j1"))
        .respond_with(envelope(json!({
            "job_id": "j1",
            "id": "j1",
            "status": "preview_complete",
            "current_step": null,
            "step": "Preview"
        })))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::default());
    let waiter = JobWaiter::new(source(&server), sink.clone(), &WaitConfig::default()).with_options(fast());

    let outcome = waiter.wait("j1").await;

    assert!(!outcome.timed_out);
    assert_eq!(outcome.state.status, JobStatus::PreviewComplete);
    assert_eq!(outcome.state.step(), "Preview");
    assert_eq!(outcome.progress, 100.0);
    assert_eq!(sink.values().last(), Some(&100.0));
}

#[tokio::test]
async fn test_wait_survives_server_errors_and_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/j1/messages"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/j1"))
        .respond_with(envelope(json!({"job_id": "j1", "status": "queued"})))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::default());
    let waiter = JobWaiter::new(source(&server), sink.clone(), &WaitConfig::default()).with_options(WaitOptions {
        timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(20),
    });

    let outcome = waiter.wait("j1").await;

    assert!(outcome.timed_out);
    assert_eq!(outcome.state.status, JobStatus::Queued);
    assert!(outcome.timeout_note.is_some());
    assert!(sink.values().iter().all(|v| *v < 100.0));
}

#[tokio::test]
async fn test_source_reports_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": {"code": "job_not_found", "message": "No such job"}
        })))
        .mount(&server)
        .await;

    let err = source(&server).get_status("missing").await.unwrap_err();

    match err {
        SourceError::Api { status, code, message } => {
            assert_eq!(status, 404);
            assert_eq!(code, "job_not_found");
            assert_eq!(message, "No such job");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
