//! Variable resolution against environment files on disk.

use super::ProjectTree;
use rest_runner::environment::{
    available_environments, Environment, FileEnvironmentIndex, PRIVATE_ENV_FILE, PUBLIC_ENV_FILE,
};
use rest_runner::template::parse_file;
use rest_runner::variables::{DynamicRegistry, GlobalContext, VariableSubstitutor};
use rest_runner::ProjectContext;
use std::path::Path;
use std::sync::Arc;

const ENV_FILE: &str = r#"{
  "$shared": { "version": "v2" },
  "dev:base": { "host": "api.dev.example" },
  "dev:alt": { "host": "alt.dev.example", "port": "8081" },
  "prod:base": { "host": "api.example" },
  "local": { "host": "localhost" }
}"#;

fn index_for(project: &ProjectContext) -> FileEnvironmentIndex {
    FileEnvironmentIndex::scan(
        project,
        vec![PUBLIC_ENV_FILE.to_string(), PRIVATE_ENV_FILE.to_string()],
    )
}

fn substitutor(
    project: &ProjectContext,
    file: &Path,
    environments: &[&str],
    global: GlobalContext,
) -> VariableSubstitutor {
    let environment = Environment::for_file(
        Arc::new(index_for(project)),
        project,
        Some(file),
        environments.iter().map(|name| name.to_string()).collect(),
    );
    VariableSubstitutor::new(environment, global).with_project(project.clone())
}

#[test]
fn test_environment_value_reaches_request_line() {
    let tree = ProjectTree::new();
    tree.write("http-client.env.json", ENV_FILE);
    let file = tree.write("dev/ping.http", "GET {{host}}/ping\n");
    let project = ProjectContext::new(tree.root());

    let templates = parse_file("GET {{host}}/ping\n", Some(&file)).unwrap();
    let substitutor = substitutor(&project, &file, &["dev:base"], GlobalContext::new());

    let request = templates[0].render(&substitutor);
    assert_eq!(request.method.to_string(), "GET");
    assert_eq!(request.url, "api.dev.example/ping");
}

#[test]
fn test_transient_wins_over_global() {
    let tree = ProjectTree::new();
    let file = tree.write("api.http", "GET http://h/{{token}}\n");
    let project = ProjectContext::new(tree.root());

    let global = GlobalContext::new();
    global.set_value("token", "xyz");
    let substitutor = substitutor(&project, &file, &[], global);
    substitutor.variables().set("token", "abc");

    assert_eq!(substitutor.substitute("{{token}}"), "abc");
    substitutor.variables().remove("token");
    assert_eq!(substitutor.substitute("{{token}}"), "xyz");
}

#[test]
fn test_unregistered_dynamic_variable_is_empty() {
    let substitutor =
        VariableSubstitutor::empty().with_dynamic_registry(DynamicRegistry::empty());
    substitutor.variables().set("timestamp", "not-used");
    substitutor.global().set_value("timestamp", "not-used");

    assert_eq!(substitutor.substitute("t={{$timestamp}}"), "t=");
    assert_eq!(substitutor.substitute("t={{$timestamp:0}}"), "t=0");
}

#[test]
fn test_environment_names_filtered_by_top_level_directory() {
    let tree = ProjectTree::new();
    tree.write("http-client.env.json", ENV_FILE);
    let nested = tree.write("dev/users/list.http", "GET {{host}}/users\n");
    let at_root = tree.write("root.http", "GET {{host}}/\n");
    let project = ProjectContext::new(tree.root());
    let index = index_for(&project);

    assert_eq!(
        available_environments(&index, &project, Some(&nested)).unwrap(),
        vec!["dev:alt".to_string(), "dev:base".to_string()]
    );
    assert_eq!(
        available_environments(&index, &project, Some(&at_root)).unwrap(),
        vec!["dev:alt", "dev:base", "local", "prod:base"]
    );
    assert_eq!(
        available_environments(&index, &project, None).unwrap().len(),
        4
    );
}

#[test]
fn test_layered_environments_first_hit_wins() {
    let tree = ProjectTree::new();
    tree.write("http-client.env.json", ENV_FILE);
    let file = tree.write("dev/a.http", "GET {{host}}:{{port}}\n");
    let project = ProjectContext::new(tree.root());

    let substitutor = substitutor(&project, &file, &["dev:base", "dev:alt"], GlobalContext::new());
    assert_eq!(substitutor.substitute("{{host}}:{{port}}"), "api.dev.example:8081");
    assert_eq!(substitutor.substitute("/{{version}}"), "/v2");
}

#[test]
fn test_private_file_overrides_public() {
    let tree = ProjectTree::new();
    tree.write(
        "http-client.env.json",
        r#"{"dev": {"user": "public", "password": "changeme"}}"#,
    );
    tree.write(
        "config/http-client.private.env.json",
        r#"{"dev": {"password": "s3cret"}}"#,
    );
    let file = tree.write("a.http", "GET http://h/\n");
    let project = ProjectContext::new(tree.root());

    let substitutor = substitutor(&project, &file, &["dev"], GlobalContext::new());
    assert_eq!(substitutor.substitute("{{user}}:{{password}}"), "public:s3cret");
}

#[test]
fn test_scratch_file_sees_project_and_scratch_environments() {
    let tree = ProjectTree::new();
    tree.write("http-client.env.json", r#"{"dev": {"host": "project"}}"#);
    let scratch = ProjectTree::new();
    scratch.write("http-client.env.json", r#"{"scratchy": {"host": "scratch"}}"#);
    let scratch_file = scratch.write("try.http", "GET {{host}}\n");
    let project = ProjectContext::new(tree.root()).with_scratch_root(scratch.root());
    let index = index_for(&project);

    assert_eq!(
        available_environments(&index, &project, Some(&scratch_file)).unwrap(),
        vec!["dev", "scratchy"]
    );

    // Project files never see the scratch area.
    let project_file = tree.write("a.http", "GET {{host}}\n");
    assert_eq!(
        available_environments(&index, &project, Some(&project_file)).unwrap(),
        vec!["dev"]
    );
}

#[test]
fn test_external_file_only_sees_its_own_directory() {
    let project_tree = ProjectTree::new();
    project_tree.write("http-client.env.json", r#"{"dev": {"host": "project"}}"#);
    let project = ProjectContext::new(project_tree.root());

    let outside = ProjectTree::new();
    outside.write("http-client.env.json", r#"{"ext": {"host": "outside"}}"#);
    outside.write("nested/http-client.env.json", r#"{"deep": {"host": "deeper"}}"#);
    let external = outside.write("call.http", "GET {{host}}\n");

    let mut index = index_for(&project);
    index.scan_directory(&outside.root());
    index.scan_directory(&outside.path("nested"));

    assert_eq!(
        available_environments(&index, &project, Some(&external)).unwrap(),
        vec!["ext"]
    );

    let substitutor = substitutor_with(index, &project, &external, &["ext", "dev", "deep"]);
    assert_eq!(substitutor.substitute("{{host}}"), "outside");
}

fn substitutor_with(
    index: FileEnvironmentIndex,
    project: &ProjectContext,
    file: &Path,
    environments: &[&str],
) -> VariableSubstitutor {
    let environment = Environment::for_file(
        Arc::new(index),
        project,
        Some(file),
        environments.iter().map(|name| name.to_string()).collect(),
    );
    VariableSubstitutor::new(environment, GlobalContext::new())
}

#[test]
fn test_broken_environment_file_is_skipped() {
    let tree = ProjectTree::new();
    tree.write("a/http-client.env.json", "{ not json");
    tree.write("b/http-client.env.json", r#"{"dev": {"host": "fine"}}"#);
    let file = tree.write("b/x.http", "GET {{host}}\n");
    let project = ProjectContext::new(tree.root());

    let substitutor = substitutor(&project, &file, &["dev"], GlobalContext::new());
    assert_eq!(substitutor.substitute("{{host}}"), "fine");
}

#[test]
fn test_project_aware_dynamic_variables() {
    let tree = ProjectTree::new();
    tree.write(".env", "API_KEY=from-dotenv\n# comment\nQUOTED=\"q v\"\n");
    let file = tree.write("a.http", "GET http://h/\n");
    let project = ProjectContext::new(tree.root());

    let substitutor = substitutor(&project, &file, &[], GlobalContext::new());
    assert_eq!(substitutor.substitute("{{$dotenv API_KEY}}"), "from-dotenv");
    assert_eq!(substitutor.substitute("{{$dotenv QUOTED}}"), "q v");
    assert_eq!(
        substitutor.substitute("{{$projectRoot}}"),
        tree.root().display().to_string()
    );

    // Without a project the default applies.
    let detached = VariableSubstitutor::empty();
    assert_eq!(detached.substitute("[{{$projectRoot:none}}]"), "[none]");
}

#[test]
fn test_fallback_and_missing_values() {
    let substitutor = VariableSubstitutor::empty();
    assert_eq!(
        substitutor.substitute("{{host:localhost:8080}}/{{path}}"),
        "localhost:8080/"
    );
}
