//! Variable resolution and sequential batch execution for `.http` files.
//!
//! # Architecture
//!
//! - **template**: parses `.http` files into request templates (node trees)
//! - **variables**: the resolution chain (dynamic registry, transient
//!   variables, global context, environment) and the substitutor
//! - **environment**: environment files, search scopes and the index trait
//! - **executor**: the HTTP transport and batch cancellation
//! - **runner**: pre-request scripts, the sequential controller and reporting
//! - **config**: runner settings
//! - **project**: project root and scratch area
//! - **models**: resolved requests and responses
//!
//! # Resolution
//!
//! `{{name}}` is looked up in transient variables, then the global context,
//! then the selected environments; `{{name:fallback}}` supplies a default.
//! `{{$name args}}` goes to the dynamic registry only:
//!
//! ```http
//! POST https://{{host:localhost:8080}}/orders
//! X-Request-Id: {{$uuid}}
//! Authorization: Bearer {{token}}
//!
//! {"created": "{{$isoTimestamp}}"}
//! ```
//!
//! # Running a batch
//!
//! ```no_run
//! use rest_runner::environment::Environment;
//! use rest_runner::runner::{ConsoleSink, ExecutionBatch, RequestBatchRunner};
//! use rest_runner::template::parse_file;
//! use rest_runner::variables::{GlobalContext, VariableSubstitutor};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let templates = parse_file("GET https://example.com/health", None)?;
//! let substitutor = VariableSubstitutor::new(Environment::empty(), GlobalContext::new());
//! let runner = RequestBatchRunner::from_config(&rest_runner::config::get_config())?;
//!
//! let report = runner
//!     .run(ExecutionBatch::new(templates, &substitutor), &ConsoleSink::stdout())
//!     .await?;
//! std::process::exit(report.exit_code.code());
//! # }
//! ```

pub mod config;
pub mod environment;
pub mod executor;
pub mod models;
pub mod project;
pub mod runner;
pub mod template;
pub mod variables;

pub use project::ProjectContext;
pub use runner::{BatchReport, ExitCode, RequestBatchRunner, RunOutcome};
pub use variables::VariableSubstitutor;
