//! Batch execution of parsed requests.
//!
//! - **descriptor**: requests bound to their substitutor, and the batch
//! - **controller**: the sequential dispatch state machine
//! - **hooks** / **discovery** / **script**: pre-request scripts and
//!   response handlers
//! - **sink**: progress reporting
//! - **outcome**: per-request outcomes and exit codes

pub mod controller;
pub mod descriptor;
pub mod discovery;
pub mod hooks;
pub mod outcome;
pub mod script;
pub mod sink;

pub use controller::{ControllerState, SequentialExecutionController};
pub use descriptor::{ExecutionBatch, RequestDescriptor};
pub use discovery::find_pre_request_script;
pub use hooks::{NoHooks, RequestHooks, ScriptHooks};
pub use outcome::{BatchReport, ExitCode, Presentation, RequestReport, RunOutcome};
pub use script::{DirectiveScriptEngine, ScriptBindings, ScriptEngine, ScriptError};
pub use sink::{ConsoleLevel, ConsoleSink, ReportingSink};

use crate::config::RunnerConfig;
use crate::executor::{CancelHandle, ExecutionConfig, RequestError, ReqwestTransport, Transport};
use crate::project::ProjectContext;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default name of the pre-request script file.
pub const PRE_REQUEST_SCRIPT: &str = "pre-request-script.js";

/// Errors that stop a batch before any request is sent.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("No requests to run")]
    EmptyBatch,

    #[error("Failed to set up HTTP transport: {0}")]
    Transport(#[from] RequestError),
}

/// Runs batches: script hooks, sequential dispatch, reporting.
pub struct RequestBatchRunner {
    project: Option<ProjectContext>,
    transport: Arc<dyn Transport>,
    engine: Arc<dyn ScriptEngine>,
    script_name: String,
    cancel: CancelHandle,
    batch_timeout: Option<Duration>,
    console_level: ConsoleLevel,
}

impl RequestBatchRunner {
    /// Runner over `transport` with the bundled script engine.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            project: None,
            transport,
            engine: Arc::new(DirectiveScriptEngine::new()),
            script_name: PRE_REQUEST_SCRIPT.to_string(),
            cancel: CancelHandle::new(),
            batch_timeout: None,
            console_level: ConsoleLevel::default(),
        }
    }

    /// Runner with a reqwest transport and the settings of `config`.
    pub fn from_config(config: &RunnerConfig) -> Result<Self, RunnerError> {
        let transport = ReqwestTransport::new(ExecutionConfig::from_config(config))?;
        Ok(Self::new(Arc::new(transport))
            .with_script_name(config.pre_request_script.clone())
            .with_batch_timeout(config.batch_timeout_duration()))
    }

    /// Project used for pre-request script discovery and scratch detection.
    ///
    /// # Arguments
    ///
    /// * `project` - Root (and optional scratch root) the batch's files live under
    pub fn with_project(mut self, project: ProjectContext) -> Self {
        self.project = Some(project);
        self
    }

    /// Replaces the bundled [`DirectiveScriptEngine`].
    pub fn with_engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// File name searched for upward from each request file.
    /// Defaults to [`PRE_REQUEST_SCRIPT`].
    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    /// Deadline for the whole batch, measured from the start of [`run`].
    /// When it passes the cancel handle fires and the remaining requests are skipped.
    ///
    /// `None` disables the deadline.
    ///
    /// [`run`]: RequestBatchRunner::run
    pub fn with_batch_timeout(mut self, batch_timeout: Option<Duration>) -> Self {
        self.batch_timeout = batch_timeout;
        self
    }

    /// Lowest script console level forwarded to the sink.
    pub fn with_console_level(mut self, level: ConsoleLevel) -> Self {
        self.console_level = level;
        self
    }

    /// Handle that cancels the running batch. Once cancelled, later runs on
    /// this runner are cancelled before their first dispatch.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs `batch` to completion.
    ///
    /// An empty batch is reported through `sink.on_error` and rejected.
    pub async fn run(
        &self,
        batch: ExecutionBatch,
        sink: &dyn ReportingSink,
    ) -> Result<BatchReport, RunnerError> {
        if batch.is_empty() {
            let err = RunnerError::EmptyBatch;
            sink.on_error(&err.to_string());
            return Err(err);
        }

        let total = batch.len();
        log::debug!("Running batch of {} request(s)", total);
        sink.on_batch_started(Presentation::for_len(total), total);

        let mut hooks = ScriptHooks::new(Arc::clone(&self.engine), self.script_name.clone())
            .with_console_level(self.console_level);
        if let Some(project) = &self.project {
            hooks = hooks.with_project(project.clone());
        }

        let controller = SequentialExecutionController::new(
            batch.into_descriptors(),
            Arc::clone(&self.transport),
            self.cancel.clone(),
        )
        .with_deadline(self.batch_timeout);

        Ok(controller.run(sink, &hooks).await)
    }
}
