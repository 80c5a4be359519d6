//! Full runs against a mock HTTP server: environment files, pre-request
//! scripts, response handlers and the reqwest transport.

use super::{ProjectTree, RecordingSink};
use rest_runner::config::RunnerConfig;
use rest_runner::environment::{Environment, FileEnvironmentIndex, PRIVATE_ENV_FILE, PUBLIC_ENV_FILE};
use rest_runner::runner::{ExecutionBatch, ExitCode, RequestBatchRunner, RunOutcome};
use rest_runner::template::parse_file;
use rest_runner::variables::{GlobalContext, VariableSubstitutor};
use rest_runner::ProjectContext;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn runner(project: &ProjectContext) -> RequestBatchRunner {
    let config = RunnerConfig {
        timeout: 5_000,
        ..RunnerConfig::default()
    };
    RequestBatchRunner::from_config(&config)
        .unwrap()
        .with_project(project.clone())
}

fn substitutor(
    project: &ProjectContext,
    file: &Path,
    environments: &[&str],
    global: GlobalContext,
) -> VariableSubstitutor {
    let index = FileEnvironmentIndex::scan(
        project,
        vec![PUBLIC_ENV_FILE.to_string(), PRIVATE_ENV_FILE.to_string()],
    );
    let environment = Environment::for_file(
        Arc::new(index),
        project,
        Some(file),
        environments.iter().map(|name| name.to_string()).collect(),
    );
    VariableSubstitutor::new(environment, global).with_project(project.clone())
}

#[tokio::test]
async fn test_login_flow_with_scripts_and_handlers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("X-Request-Id", "req-dev"))
        .and(body_json(json!({"user": "alice"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-42"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(query_param("v", "v2"))
        .and(header("Authorization", "Bearer tok-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let tree = ProjectTree::new();
    tree.write(
        "http-client.env.json",
        &json!({
            "$shared": {"version": "v2"},
            "api:dev": {"host": server.uri(), "user": "alice"}
        })
        .to_string(),
    );
    tree.write(
        "api/pre-request-script.js",
        "variables.set(\"requestId\", \"req-\" + environment.get(\"stage\"))\nconsole.log(\"sending\", request.method)",
    );
    tree.write("api/http-client.private.env.json", r#"{"api:dev": {"stage": "dev"}}"#);
    let content = r#"# @name login
POST {{host}}/login
Content-Type: application/json
X-Request-Id: {{requestId}}

{"user": "{{user}}"}

> {%
global.set("token", response.body.token)
console.info("status", response.status)
%}

###

GET {{host}}/profile?v={{version}}
Authorization: Bearer {{token}}
"#;
    let file = tree.write("api/auth.http", content);
    let project = ProjectContext::new(tree.root());

    let global_path = tree.path("global.json");
    let global = GlobalContext::load(&global_path).unwrap();
    let substitutor = substitutor(&project, &file, &["api:dev"], global);
    let sink = RecordingSink::default();

    let report = runner(&project)
        .run(
            ExecutionBatch::new(parse_file(content, Some(&file)).unwrap(), &substitutor),
            &sink,
        )
        .await
        .unwrap();

    assert_eq!(report.exit_code, ExitCode::Success);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.requests[0].display_name, "login");
    assert_eq!(report.requests[1].status, Some(200));
    assert_eq!(
        sink.console(),
        vec!["info sending POST", "info status 200", "info sending GET"]
    );

    substitutor.global().save().unwrap();
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&global_path).unwrap()).unwrap();
    assert_eq!(saved["variables"]["token"], "tok-42");
}

#[tokio::test]
async fn test_http_error_status_is_still_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tree = ProjectTree::new();
    let content = format!("DELETE {}/items/1\n", server.uri());
    let file = tree.write("items.http", &content);
    let project = ProjectContext::new(tree.root());

    let report = runner(&project)
        .run(
            ExecutionBatch::new(
                parse_file(&content, Some(&file)).unwrap(),
                &substitutor(&project, &file, &[], GlobalContext::new()),
            ),
            &RecordingSink::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.requests[0].outcome, RunOutcome::Succeeded);
    assert_eq!(report.requests[0].status, Some(404));
    assert_eq!(report.exit_code, ExitCode::Success);
}

#[tokio::test]
async fn test_unreachable_host_fails_and_batch_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let tree = ProjectTree::new();
    let content = format!(
        "GET http://127.0.0.1:1/down\n\n###\n\nGET {}/health\n",
        server.uri()
    );
    let file = tree.write("health.http", &content);
    let project = ProjectContext::new(tree.root());
    let sink = RecordingSink::default();

    let report = runner(&project)
        .run(
            ExecutionBatch::new(
                parse_file(&content, Some(&file)).unwrap(),
                &substitutor(&project, &file, &[], GlobalContext::new()),
            ),
            &sink,
        )
        .await
        .unwrap();

    assert!(matches!(report.requests[0].outcome, RunOutcome::FailedWithError(_)));
    assert_eq!(report.requests[1].outcome, RunOutcome::Succeeded);
    assert_eq!(report.exit_code, ExitCode::ExecutionFailed);
    assert_eq!(sink.events().last().map(String::as_str), Some("finished 3"));
}

#[tokio::test]
async fn test_batch_timeout_cancels_slow_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let tree = ProjectTree::new();
    let content = format!("GET {0}/slow\n\n###\n\nGET {0}/after\n", server.uri());
    let file = tree.write("slow.http", &content);
    let project = ProjectContext::new(tree.root());

    let runner = runner(&project).with_batch_timeout(Some(Duration::from_millis(200)));
    let report = runner
        .run(
            ExecutionBatch::new(
                parse_file(&content, Some(&file)).unwrap(),
                &substitutor(&project, &file, &[], GlobalContext::new()),
            ),
            &RecordingSink::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.requests.len(), 1);
    assert_eq!(report.requests[0].outcome, RunOutcome::Cancelled);
    assert_eq!(report.exit_code, ExitCode::Cancelled);
    assert!(runner.cancel_handle().is_cancelled());
}
