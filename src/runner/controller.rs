//! Sequential dispatch of a batch.

use super::descriptor::RequestDescriptor;
use super::hooks::RequestHooks;
use super::outcome::{BatchReport, ExitCode, RequestReport, RunOutcome};
use super::sink::ReportingSink;
use crate::executor::{CancelHandle, RequestError, Transport};
use crate::models::HttpResponse;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Where the controller is in its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// Request `i` is the next to dispatch, or is in flight.
    Running(usize),
    Finished,
}

/// Runs descriptors one after another, at most one request in flight.
///
/// Each dispatch runs on its own tokio task and hands its result back over a
/// oneshot channel; the controller loop waits for it before moving on. A
/// failed request never stops the batch. Cancellation, from the handle or
/// the batch deadline, is checked before every dispatch.
pub struct SequentialExecutionController {
    descriptors: Vec<RequestDescriptor>,
    transport: Arc<dyn Transport>,
    cancel: CancelHandle,
    deadline: Option<Duration>,
    state: ControllerState,
}

impl SequentialExecutionController {
    /// Controller in the [`ControllerState::Idle`] state.
    ///
    /// # Arguments
    ///
    /// * `descriptors` - Requests in dispatch order
    /// * `transport` - Sends each rendered request
    /// * `cancel` - Checked before every dispatch and passed to the transport
    pub fn new(
        descriptors: Vec<RequestDescriptor>,
        transport: Arc<dyn Transport>,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            descriptors,
            transport,
            cancel,
            deadline: None,
            state: ControllerState::Idle,
        }
    }

    /// Cancels the batch once `deadline` has passed since [`run`](Self::run)
    /// started.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Current state; [`ControllerState::Idle`] until `run` starts.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Drives the batch to completion.
    ///
    /// `sink.on_batch_finished` is called exactly once, after the last report.
    pub async fn run(mut self, sink: &dyn ReportingSink, hooks: &dyn RequestHooks) -> BatchReport {
        let deadline_at = self.deadline.map(|deadline| Instant::now() + deadline);
        let mut reports = Vec::with_capacity(self.descriptors.len());
        let mut cancelled = false;

        self.state = if self.descriptors.is_empty() {
            ControllerState::Finished
        } else {
            ControllerState::Running(0)
        };

        while let ControllerState::Running(index) = self.state {
            if self.stop_requested(index, deadline_at) {
                cancelled = true;
                self.state = ControllerState::Finished;
                break;
            }

            let descriptor = &self.descriptors[index];
            if let Err(err) = hooks.before_dispatch(descriptor, sink) {
                log::warn!("Pre-request script failed for {}: {}", descriptor.id(), err);
                sink.on_error(&err.to_string());
            }

            // The script may have run past the deadline or a cancel.
            if self.stop_requested(index, deadline_at) {
                cancelled = true;
                self.state = ControllerState::Finished;
                break;
            }

            sink.on_request_started(descriptor);
            let started = Instant::now();
            let result = self.dispatch(descriptor, deadline_at).await;
            let elapsed = started.elapsed();

            let report = match result {
                Ok(response) => {
                    sink.on_request_completed(descriptor, &RunOutcome::Succeeded, Some(&response));
                    let handler_error = hooks
                        .after_response(descriptor, &response, sink)
                        .err()
                        .map(|err| {
                            log::warn!("Response handler failed for {}: {}", descriptor.id(), err);
                            sink.on_error(&err.to_string());
                            err.to_string()
                        });
                    report(descriptor, RunOutcome::Succeeded, Some(&response), elapsed, handler_error)
                }
                Err(RequestError::Cancelled) => {
                    cancelled = true;
                    sink.on_request_completed(descriptor, &RunOutcome::Cancelled, None);
                    report(descriptor, RunOutcome::Cancelled, None, elapsed, None)
                }
                Err(err) => {
                    log::debug!("Request {} failed: {}", descriptor.id(), err);
                    let outcome = RunOutcome::FailedWithError(err.to_string());
                    sink.on_request_completed(descriptor, &outcome, None);
                    report(descriptor, outcome, None, elapsed, None)
                }
            };
            reports.push(report);

            self.state = if !cancelled && index + 1 < self.descriptors.len() {
                ControllerState::Running(index + 1)
            } else {
                ControllerState::Finished
            };
        }

        let exit_code = ExitCode::aggregate(&reports, cancelled);
        sink.on_batch_finished(exit_code);
        BatchReport {
            requests: reports,
            exit_code,
        }
    }

    /// Fires the cancel handle once the deadline has passed, then reports
    /// whether request `index` and everything after it should be skipped.
    fn stop_requested(&self, index: usize, deadline_at: Option<Instant>) -> bool {
        if deadline_at.map_or(false, |at| Instant::now() >= at) {
            log::debug!("Batch deadline passed before request {}", index);
            self.cancel.cancel();
        }
        if self.cancel.is_cancelled() {
            log::debug!(
                "Batch cancelled, skipping {} remaining request(s)",
                self.descriptors.len() - index
            );
            return true;
        }
        false
    }

    async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        deadline_at: Option<Instant>,
    ) -> Result<HttpResponse, RequestError> {
        let request = descriptor.render();
        log::debug!("Dispatching {} {}", request.method, request.url);

        let (tx, mut rx) = oneshot::channel();
        let transport = Arc::clone(&self.transport);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let result = transport.execute(&request, &cancel).await;
            // The receiver only goes away if the controller itself was dropped.
            let _ = tx.send(result);
        });

        let received = match deadline_at {
            Some(at) => {
                tokio::select! {
                    received = &mut rx => received,
                    _ = tokio::time::sleep_until(at) => {
                        log::debug!("Batch deadline passed during {}", descriptor.id());
                        self.cancel.cancel();
                        rx.await
                    }
                }
            }
            None => rx.await,
        };

        received.unwrap_or_else(|_| {
            Err(RequestError::NetworkError(
                "request task ended without a result".to_string(),
            ))
        })
    }
}

fn report(
    descriptor: &RequestDescriptor,
    outcome: RunOutcome,
    response: Option<&HttpResponse>,
    elapsed: Duration,
    handler_error: Option<String>,
) -> RequestReport {
    RequestReport {
        request_id: descriptor.id().to_string(),
        display_name: descriptor.display_name(),
        outcome,
        status: response.map(|response| response.status_code),
        duration: Some(elapsed),
        handler_error,
    }
}
