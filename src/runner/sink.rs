//! Reporting surface for batch progress.

use super::descriptor::RequestDescriptor;
use super::outcome::{ExitCode, Presentation, RunOutcome};
use crate::models::HttpResponse;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

/// Severity of script console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum ConsoleLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConsoleLevel::Debug => "debug",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
        };
        f.write_str(label)
    }
}

impl FromStr for ConsoleLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(ConsoleLevel::Debug),
            "info" | "log" => Ok(ConsoleLevel::Info),
            "warn" | "warning" => Ok(ConsoleLevel::Warn),
            "error" => Ok(ConsoleLevel::Error),
            other => Err(format!("unknown console level '{}'", other)),
        }
    }
}

/// Receives batch events in order.
///
/// Calls arrive from the task driving the batch, one at a time.
pub trait ReportingSink: Send + Sync {
    fn on_batch_started(&self, presentation: Presentation, total: usize);

    fn on_request_started(&self, descriptor: &RequestDescriptor);

    fn on_request_completed(
        &self,
        descriptor: &RequestDescriptor,
        outcome: &RunOutcome,
        response: Option<&HttpResponse>,
    );

    /// Called exactly once per batch that started.
    fn on_batch_finished(&self, exit_code: ExitCode);

    fn on_error(&self, message: &str);

    fn on_console_output(&self, level: ConsoleLevel, message: &str);
}

/// Plain-text sink writing progress to a stream (stdout by default).
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
    show_bodies: bool,
    presentation: Mutex<Presentation>,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl ConsoleSink {
    /// Sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Sink writing to `out`.
    ///
    /// # Arguments
    ///
    /// * `out` - Destination for progress lines and response bodies
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            show_bodies: true,
            presentation: Mutex::new(Presentation::Single),
        }
    }

    /// Whether single-request runs print the response body.
    pub fn with_bodies(mut self, show_bodies: bool) -> Self {
        self.show_bodies = show_bodies;
        self
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(out, "{}", line) {
            log::warn!("Failed to write console output: {}", err);
        }
    }

    fn presentation(&self) -> Presentation {
        *self
            .presentation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReportingSink for ConsoleSink {
    fn on_batch_started(&self, presentation: Presentation, total: usize) {
        *self
            .presentation
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = presentation;
        if presentation == Presentation::Aggregate {
            self.write_line(&format!("Running {} requests", total));
        }
    }

    fn on_request_started(&self, descriptor: &RequestDescriptor) {
        self.write_line(&format!("### {}", descriptor.display_name()));
    }

    fn on_request_completed(
        &self,
        _descriptor: &RequestDescriptor,
        outcome: &RunOutcome,
        response: Option<&HttpResponse>,
    ) {
        match (outcome, response) {
            (RunOutcome::Succeeded, Some(response)) => {
                self.write_line(&format!(
                    "<- {} {} ({} ms, {} bytes)",
                    response.status_code,
                    response.status_text,
                    response.duration.as_millis(),
                    response.size
                ));
                if self.show_bodies && self.presentation() == Presentation::Single {
                    let body = response.body_text();
                    if !body.is_empty() {
                        self.write_line(&body);
                    }
                }
            }
            (outcome, _) => self.write_line(&format!("<- {}", outcome)),
        }
    }

    fn on_batch_finished(&self, exit_code: ExitCode) {
        self.write_line(&format!("{}", exit_code));
    }

    fn on_error(&self, message: &str) {
        self.write_line(&format!("error: {}", message));
    }

    fn on_console_output(&self, level: ConsoleLevel, message: &str) {
        self.write_line(&format!("[{}] {}", level, message));
    }
}
