//! Shared fixtures for the integration tests.

pub mod end_to_end_test;
pub mod properties_test;
pub mod request_chaining_test;
pub mod resolution_test;

use rest_runner::models::HttpResponse;
use rest_runner::runner::{
    ConsoleLevel, ExitCode, Presentation, ReportingSink, RequestDescriptor, RunOutcome,
};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Routes library logging to the test harness (run once).
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A project directory on disk.
pub struct ProjectTree {
    dir: TempDir,
}

impl ProjectTree {
    pub fn new() -> Self {
        init_test_env();
        let dir = TempDir::new().expect("Failed to create temp dir");
        Self { dir }
    }

    /// Canonical root, so prefix checks match canonicalized request paths.
    pub fn root(&self) -> PathBuf {
        fs::canonicalize(self.dir.path()).expect("Failed to canonicalize temp dir")
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Writes `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(&path).expect("Failed to create dir");
        path
    }
}

/// Records every sink event as a line of text.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<String>>,
    console: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn console(&self) -> Vec<String> {
        self.console.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.starts_with("error "))
            .collect()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ReportingSink for RecordingSink {
    fn on_batch_started(&self, presentation: Presentation, total: usize) {
        self.push(format!("batch {:?} {}", presentation, total));
    }

    fn on_request_started(&self, descriptor: &RequestDescriptor) {
        self.push(format!("start {}", descriptor.id()));
    }

    fn on_request_completed(
        &self,
        descriptor: &RequestDescriptor,
        outcome: &RunOutcome,
        response: Option<&HttpResponse>,
    ) {
        let status = response.map_or("-".to_string(), |r| r.status_code.to_string());
        self.push(format!("done {} {} {}", descriptor.id(), outcome, status));
    }

    fn on_batch_finished(&self, exit_code: ExitCode) {
        self.push(format!("finished {}", exit_code.code()));
    }

    fn on_error(&self, message: &str) {
        self.push(format!("error {}", message));
    }

    fn on_console_output(&self, level: ConsoleLevel, message: &str) {
        self.console
            .lock()
            .unwrap()
            .push(format!("{} {}", level, message));
    }
}
