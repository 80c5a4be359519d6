//! Batches over a stub transport: scripts, handlers and ordering.

use super::{ProjectTree, RecordingSink};
use async_trait::async_trait;
use rest_runner::executor::{CancelHandle, RequestError, Transport};
use rest_runner::models::{HttpRequest, HttpResponse};
use rest_runner::runner::{ExecutionBatch, ExitCode, RequestBatchRunner, RunOutcome, RunnerError};
use rest_runner::template::{parse_file, RequestTemplate};
use rest_runner::variables::VariableSubstitutor;
use rest_runner::ProjectContext;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Records every URL; `/fail` paths error, `/cancel` paths cancel the batch,
/// everything else answers `{"token": "t-<n>"}` with n the call number.
#[derive(Default)]
struct StubTransport {
    urls: Mutex<Vec<String>>,
}

impl StubTransport {
    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(
        &self,
        request: &HttpRequest,
        cancel: &CancelHandle,
    ) -> Result<HttpResponse, RequestError> {
        let count = {
            let mut urls = self.urls.lock().unwrap();
            urls.push(request.url.clone());
            urls.len()
        };

        if request.url.contains("/fail") {
            return Err(RequestError::NetworkError("connection refused".to_string()));
        }
        if request.url.contains("/cancel") {
            cancel.cancel();
        }

        let mut response = HttpResponse::new(200, "OK".to_string());
        response.add_header("Content-Type".to_string(), "application/json".to_string());
        response.set_body(format!(r#"{{"token": "t-{}"}}"#, count).into_bytes());
        Ok(response)
    }
}

fn templates(path: &Path) -> Vec<RequestTemplate> {
    let content = fs::read_to_string(path).unwrap();
    parse_file(&content, Some(path)).unwrap()
}

fn runner(project: &ProjectContext, transport: &Arc<StubTransport>) -> RequestBatchRunner {
    RequestBatchRunner::new(transport.clone()).with_project(project.clone())
}

fn substitutor(project: &ProjectContext) -> VariableSubstitutor {
    VariableSubstitutor::empty().with_project(project.clone())
}

#[tokio::test]
async fn test_handler_values_flow_forward_only() {
    let tree = ProjectTree::new();
    let file = tree.write(
        "flow.http",
        r#"POST http://api/login?token={{token}}

> {% global.set("token", response.body.token) %}

###

GET http://api/profile?token={{token}}
"#,
    );
    let project = ProjectContext::new(tree.root());
    let transport = Arc::new(StubTransport::default());
    let sink = RecordingSink::default();

    let substitutor = substitutor(&project);
    let report = runner(&project, &transport)
        .run(ExecutionBatch::new(templates(&file), &substitutor), &sink)
        .await
        .unwrap();

    assert_eq!(report.exit_code, ExitCode::Success);
    assert_eq!(
        transport.urls(),
        vec!["http://api/login?token=", "http://api/profile?token=t-1"]
    );
    assert_eq!(substitutor.global().get_value("token"), Some("t-1".to_string()));
}

#[tokio::test]
async fn test_nearest_pre_request_script_applies_per_file() {
    let tree = ProjectTree::new();
    tree.write("pre-request-script.js", r#"variables.set("who", "root")"#);
    tree.write("api/pre-request-script.js", r#"variables.set("who", "api")"#);
    let top = tree.write("top.http", "GET http://h/{{who}}\n");
    let nested = tree.write("api/v1/users.http", "GET http://h/{{who}}\n");
    let project = ProjectContext::new(tree.root());
    let transport = Arc::new(StubTransport::default());

    let mut all = templates(&top);
    all.extend(templates(&nested));
    all.extend(templates(&top));
    let report = runner(&project, &transport)
        .run(
            ExecutionBatch::new(all, &substitutor(&project)),
            &RecordingSink::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.requests.len(), 3);
    assert_eq!(transport.urls(), vec!["http://h/root", "http://h/api", "http://h/root"]);
}

#[tokio::test]
async fn test_script_failure_is_reported_and_batch_continues() {
    let tree = ProjectTree::new();
    tree.write("pre-request-script.js", "variables.set(\"a\"");
    let file = tree.write("a.http", "GET http://h/one\n\n###\n\nGET http://h/two\n");
    let project = ProjectContext::new(tree.root());
    let transport = Arc::new(StubTransport::default());
    let sink = RecordingSink::default();

    let report = runner(&project, &transport)
        .run(ExecutionBatch::new(templates(&file), &substitutor(&project)), &sink)
        .await
        .unwrap();

    assert_eq!(transport.urls().len(), 2);
    assert_eq!(sink.errors().len(), 2);
    assert!(sink.errors()[0].contains("Syntax error"));
    assert_eq!(report.exit_code, ExitCode::Success);
}

#[tokio::test]
async fn test_failed_request_does_not_short_circuit() {
    let tree = ProjectTree::new();
    let file = tree.write(
        "batch.http",
        "GET http://h/1\n\n###\n\nGET http://h/fail\n\n###\n\nGET http://h/3\n",
    );
    let project = ProjectContext::new(tree.root());
    let transport = Arc::new(StubTransport::default());
    let sink = RecordingSink::default();

    let report = runner(&project, &transport)
        .run(ExecutionBatch::new(templates(&file), &substitutor(&project)), &sink)
        .await
        .unwrap();

    assert_eq!(transport.urls(), vec!["http://h/1", "http://h/fail", "http://h/3"]);
    assert_eq!(report.exit_code, ExitCode::ExecutionFailed);
    assert_ne!(report.exit_code.code(), 0);
    assert!(matches!(report.requests[1].outcome, RunOutcome::FailedWithError(_)));
    assert_eq!(sink.events().first().map(String::as_str), Some("batch Aggregate 3"));
    assert_eq!(sink.events().last().map(String::as_str), Some("finished 3"));
}

#[tokio::test]
async fn test_cancellation_skips_remaining_requests_and_scripts() {
    let tree = ProjectTree::new();
    tree.write("pre-request-script.js", r#"console.log("before", request.url)"#);
    let file = tree.write(
        "batch.http",
        "GET http://h/cancel\n\n###\n\nGET http://h/2\n\n###\n\nGET http://h/3\n",
    );
    let project = ProjectContext::new(tree.root());
    let transport = Arc::new(StubTransport::default());
    let sink = RecordingSink::default();

    let report = runner(&project, &transport)
        .run(ExecutionBatch::new(templates(&file), &substitutor(&project)), &sink)
        .await
        .unwrap();

    assert_eq!(transport.urls(), vec!["http://h/cancel"]);
    assert_eq!(sink.console(), vec!["info before http://h/cancel"]);
    assert_eq!(report.exit_code, ExitCode::Cancelled);
    assert_eq!(
        sink.events()
            .iter()
            .filter(|event| event.starts_with("finished"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_empty_batch_dispatches_nothing() {
    let tree = ProjectTree::new();
    let file = tree.write("empty.http", "# only a comment\n\n###\n\n// another\n");
    let project = ProjectContext::new(tree.root());
    let transport = Arc::new(StubTransport::default());
    let sink = RecordingSink::default();

    let batch = ExecutionBatch::new(templates(&file), &substitutor(&project));
    let err = runner(&project, &transport).run(batch, &sink).await.unwrap_err();

    assert!(matches!(err, RunnerError::EmptyBatch));
    assert!(transport.urls().is_empty());
    assert_eq!(sink.events(), vec!["error No requests to run"]);
}

#[tokio::test]
async fn test_scratch_requests_skip_pre_request_scripts() {
    let tree = ProjectTree::new();
    let scratch = ProjectTree::new();
    tree.write("pre-request-script.js", r#"variables.set("who", "root")"#);
    scratch.write("pre-request-script.js", r#"variables.set("who", "scratch")"#);
    let file = scratch.write("try.http", "GET http://h/{{who:nobody}}\n");
    let project = ProjectContext::new(tree.root()).with_scratch_root(scratch.root());
    let transport = Arc::new(StubTransport::default());

    runner(&project, &transport)
        .run(
            ExecutionBatch::new(templates(&file), &substitutor(&project)),
            &RecordingSink::default(),
        )
        .await
        .unwrap();

    assert_eq!(transport.urls(), vec!["http://h/nobody"]);
}

#[tokio::test]
async fn test_handler_failure_sets_post_processing_code() {
    let tree = ProjectTree::new();
    let file = tree.write(
        "a.http",
        "GET http://h/1\n\n> {% global.set(\"x\", response.body.missing) %}\n\n###\n\nGET http://h/2\n",
    );
    let project = ProjectContext::new(tree.root());
    let transport = Arc::new(StubTransport::default());
    let sink = RecordingSink::default();

    let report = runner(&project, &transport)
        .run(ExecutionBatch::new(templates(&file), &substitutor(&project)), &sink)
        .await
        .unwrap();

    assert_eq!(transport.urls().len(), 2);
    assert_eq!(report.exit_code, ExitCode::PostProcessingFailed);
    assert!(report.requests[0].handler_error.is_some());
    assert!(report.requests[1].handler_error.is_none());
}
