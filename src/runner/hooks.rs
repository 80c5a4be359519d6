//! Script hooks run around each dispatch.

use super::descriptor::RequestDescriptor;
use super::discovery::find_pre_request_script;
use super::script::{ScriptBindings, ScriptEngine, ScriptError};
use super::sink::{ConsoleLevel, ReportingSink};
use crate::models::HttpResponse;
use crate::project::ProjectContext;
use crate::template::ResponseHandler;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callbacks the controller runs on its own task, between dispatches.
pub trait RequestHooks: Send + Sync {
    /// Runs before `descriptor` is rendered and sent.
    fn before_dispatch(
        &self,
        _descriptor: &RequestDescriptor,
        _console: &dyn ReportingSink,
    ) -> Result<(), ScriptError> {
        Ok(())
    }

    /// Runs after a response to `descriptor` arrived.
    fn after_response(
        &self,
        _descriptor: &RequestDescriptor,
        _response: &HttpResponse,
        _console: &dyn ReportingSink,
    ) -> Result<(), ScriptError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl RequestHooks for NoHooks {}

/// Runs pre-request scripts and response handlers through a [`ScriptEngine`].
pub struct ScriptHooks {
    engine: Arc<dyn ScriptEngine>,
    project: Option<ProjectContext>,
    script_name: String,
    console_level: ConsoleLevel,
}

impl ScriptHooks {
    /// Hooks evaluating scripts with `engine`.
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine for pre-request scripts and response handlers
    /// * `script_name` - File name of the pre-request script to look for
    pub fn new(engine: Arc<dyn ScriptEngine>, script_name: impl Into<String>) -> Self {
        Self {
            engine,
            project: None,
            script_name: script_name.into(),
            console_level: ConsoleLevel::default(),
        }
    }

    /// Project used for script discovery. Without one, the descriptor's
    /// substitutor project is used.
    pub fn with_project(mut self, project: ProjectContext) -> Self {
        self.project = Some(project);
        self
    }

    /// Threshold passed to scripts as their console log level.
    pub fn with_console_level(mut self, level: ConsoleLevel) -> Self {
        self.console_level = level;
        self
    }

    /// Pre-request script that applies to `descriptor`, if any.
    pub fn pre_request_script(&self, descriptor: &RequestDescriptor) -> Option<PathBuf> {
        let file = descriptor.file()?;
        let project = self
            .project
            .as_ref()
            .or_else(|| descriptor.substitutor().project())?;

        if project.is_scratch(file) {
            return None;
        }

        let start_dir = file.parent()?;
        find_pre_request_script(start_dir, project.root(), &self.script_name)
    }

    fn run_file(
        &self,
        path: &Path,
        bindings: &ScriptBindings<'_>,
    ) -> Result<(), ScriptError> {
        let source = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.engine
            .evaluate(&source, &path.display().to_string(), bindings)
    }
}

impl RequestHooks for ScriptHooks {
    fn before_dispatch(
        &self,
        descriptor: &RequestDescriptor,
        console: &dyn ReportingSink,
    ) -> Result<(), ScriptError> {
        let Some(script) = self.pre_request_script(descriptor) else {
            return Ok(());
        };

        log::debug!(
            "Running pre-request script {} for {}",
            script.display(),
            descriptor.id()
        );
        let bindings = ScriptBindings::for_descriptor(descriptor, console)
            .with_console_log_level(self.console_level);
        self.run_file(&script, &bindings)
    }

    fn after_response(
        &self,
        descriptor: &RequestDescriptor,
        response: &HttpResponse,
        console: &dyn ReportingSink,
    ) -> Result<(), ScriptError> {
        let Some(handler) = &descriptor.template().response_handler else {
            return Ok(());
        };

        let bindings = ScriptBindings::for_descriptor(descriptor, console)
            .with_response(response)
            .with_console_log_level(self.console_level);

        match handler {
            ResponseHandler::Inline(source) => {
                let origin = format!("response handler of {}", descriptor.display_name());
                self.engine.evaluate(source, &origin, &bindings)
            }
            ResponseHandler::File(path) => {
                let path = match descriptor.template().location.directory() {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                self.run_file(&path, &bindings)
            }
        }
    }
}
