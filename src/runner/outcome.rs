//! Per-request outcomes and the aggregate batch result.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// How a single request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// A response arrived, whatever its status code.
    Succeeded,
    /// The request could not be sent or no response arrived.
    FailedWithError(String),
    /// The batch was cancelled while this request was in flight.
    Cancelled,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Succeeded => write!(f, "succeeded"),
            RunOutcome::FailedWithError(message) => write!(f, "failed: {}", message),
            RunOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Process-style completion code of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExitCode {
    /// Every request got a response and every handler passed.
    Success,
    /// The batch was cancelled before it finished.
    Cancelled,
    /// A response handler failed.
    PostProcessingFailed,
    /// At least one request failed to execute.
    ExecutionFailed,
}

impl ExitCode {
    /// Process exit status for this code.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Cancelled => 1,
            ExitCode::PostProcessingFailed => 2,
            ExitCode::ExecutionFailed => 3,
        }
    }

    /// User-facing summary of the code.
    pub fn message(self) -> &'static str {
        match self {
            ExitCode::Success => "All requests completed",
            ExitCode::Cancelled => "Request execution was cancelled",
            ExitCode::PostProcessingFailed => "Response handler failed; post-processing was not completed",
            ExitCode::ExecutionFailed => "One or more requests failed to execute",
        }
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Success
    }

    /// Folds per-request results into one code.
    ///
    /// Cancellation wins over execution failures, which win over handler
    /// failures.
    pub fn aggregate(reports: &[RequestReport], cancelled: bool) -> Self {
        if cancelled {
            return ExitCode::Cancelled;
        }
        if reports
            .iter()
            .any(|report| matches!(report.outcome, RunOutcome::FailedWithError(_)))
        {
            return ExitCode::ExecutionFailed;
        }
        if reports.iter().any(|report| report.handler_error.is_some()) {
            return ExitCode::PostProcessingFailed;
        }
        ExitCode::Success
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// How results are presented: inline for one request, as a list for several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Presentation {
    Single,
    Aggregate,
}

impl Presentation {
    /// `Single` for one request, `Aggregate` otherwise.
    pub fn for_len(len: usize) -> Self {
        if len == 1 {
            Presentation::Single
        } else {
            Presentation::Aggregate
        }
    }
}

/// What happened to one request of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestReport {
    pub request_id: String,
    pub display_name: String,
    pub outcome: RunOutcome,
    /// Status code, when a response arrived.
    pub status: Option<u16>,
    pub duration: Option<Duration>,
    /// Set when the response handler failed.
    pub handler_error: Option<String>,
}

/// Result of a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// One entry per request that was dispatched, in execution order.
    pub requests: Vec<RequestReport>,
    pub exit_code: ExitCode,
}

impl BatchReport {
    /// Requests that got a response, whatever its status.
    pub fn succeeded(&self) -> usize {
        self.requests
            .iter()
            .filter(|report| report.outcome.is_success())
            .count()
    }

    /// Requests that ended with an error.
    pub fn failed(&self) -> usize {
        self.requests
            .iter()
            .filter(|report| matches!(report.outcome, RunOutcome::FailedWithError(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: RunOutcome, handler_error: Option<&str>) -> RequestReport {
        RequestReport {
            request_id: "r".to_string(),
            display_name: "GET /".to_string(),
            outcome,
            status: None,
            duration: None,
            handler_error: handler_error.map(str::to_string),
        }
    }

    #[test]
    fn test_exit_code_values_and_messages() {
        let codes = [
            ExitCode::Success,
            ExitCode::Cancelled,
            ExitCode::PostProcessingFailed,
            ExitCode::ExecutionFailed,
        ];
        let values: Vec<i32> = codes.iter().map(|code| code.code()).collect();
        assert_eq!(values, vec![0, 1, 2, 3]);

        let mut messages: Vec<&str> = codes.iter().map(|code| code.message()).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_aggregate_precedence() {
        assert_eq!(ExitCode::aggregate(&[], false), ExitCode::Success);
        assert_eq!(
            ExitCode::aggregate(&[report(RunOutcome::Succeeded, None)], false),
            ExitCode::Success
        );
        assert_eq!(
            ExitCode::aggregate(&[report(RunOutcome::Succeeded, Some("boom"))], false),
            ExitCode::PostProcessingFailed
        );
        assert_eq!(
            ExitCode::aggregate(
                &[
                    report(RunOutcome::Succeeded, Some("boom")),
                    report(RunOutcome::FailedWithError("down".to_string()), None),
                ],
                false
            ),
            ExitCode::ExecutionFailed
        );
        assert_eq!(
            ExitCode::aggregate(
                &[report(RunOutcome::FailedWithError("down".to_string()), None)],
                true
            ),
            ExitCode::Cancelled
        );
    }

    #[test]
    fn test_presentation() {
        assert_eq!(Presentation::for_len(1), Presentation::Single);
        assert_eq!(Presentation::for_len(2), Presentation::Aggregate);
    }
}
