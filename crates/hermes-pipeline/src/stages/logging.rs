//! Logging and timing behavior.
//!
//! Outermost stage of the pipeline. For every call it emits exactly one
//! [`DispatchOutcome::Started`] event and exactly one
//! [`DispatchOutcome::Completed`] or [`DispatchOutcome::Failed`] event to its
//! [`DispatchSink`], and returns the outcome of `next` unchanged.
//!
//! A dispatch future dropped before it finishes (a caller timeout, a
//! disconnected client) is reported as failed with
//! [`ErrorCategory::Cancelled`].
//!
//! # Pipeline Position
//!
//! ```text
//! Dispatcher → [Logging] → Validation → Handler
//! ```
//!
//! # Log Format
//!
//! [`TracingSink`] emits structured `tracing` events carrying:
//! - `request` - Request type name
//! - `response` - Response type name
//! - `request_id` - Dispatch request ID
//! - `elapsed_ms` - Time spent in the rest of the pipeline
//! - `category` - Error category (failures only)

use std::sync::Arc;
use std::time::Duration;

use hermes_core::{
    BoxFuture, DispatchContext, ErrorCategory, HermesError, HermesResult, Message, Reply,
    RequestId,
};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::behavior::{Behavior, Next};
use crate::stages::validation::Rejection;

/// Default threshold above which a successful dispatch is logged as slow.
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(500);

/// One observation made by the logging behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    /// Request type name.
    pub request: String,
    /// Response type name.
    pub response: String,
    /// Dispatch request ID.
    pub request_id: RequestId,
    /// What happened.
    pub outcome: DispatchOutcome,
}

/// The phase a [`DispatchEvent`] reports.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The dispatch entered the pipeline.
    Started,
    /// The handler produced a response.
    Completed {
        /// Time spent in the rest of the pipeline.
        elapsed: Duration,
    },
    /// The dispatch failed.
    Failed {
        /// Time spent in the rest of the pipeline.
        elapsed: Duration,
        /// Failure category.
        category: ErrorCategory,
        /// Failure message.
        message: String,
        /// Number of field failures, for validation errors.
        field_failures: usize,
    },
}

impl DispatchEvent {
    /// Returns the elapsed time of a completed or failed dispatch.
    #[must_use]
    pub const fn elapsed(&self) -> Option<Duration> {
        match &self.outcome {
            DispatchOutcome::Started => None,
            DispatchOutcome::Completed { elapsed } | DispatchOutcome::Failed { elapsed, .. } => {
                Some(*elapsed)
            }
        }
    }

    /// Returns `true` for a start event.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Started)
    }

    /// Returns the failure category of a failed dispatch.
    #[must_use]
    pub const fn category(&self) -> Option<ErrorCategory> {
        match &self.outcome {
            DispatchOutcome::Failed { category, .. } => Some(*category),
            _ => None,
        }
    }
}

/// Receives the events of the logging behavior.
pub trait DispatchSink: Send + Sync + 'static {
    /// Records one event.
    fn record(&self, event: &DispatchEvent);

    /// Records a request turned away by the validation stage.
    ///
    /// Called before the matching [`DispatchOutcome::Failed`] event. Failures
    /// raised by handlers never reach this method.
    fn rejected(&self, _request: &str, _rejection: Rejection) {}
}

impl<S: DispatchSink> DispatchSink for Arc<S> {
    fn record(&self, event: &DispatchEvent) {
        (**self).record(event);
    }

    fn rejected(&self, request: &str, rejection: Rejection) {
        (**self).rejected(request, rejection);
    }
}

/// Writes dispatch events as structured `tracing` events.
///
/// Starts and completions log at `info`, completions slower than the threshold
/// at `warn`. Failures log at `warn` when the caller caused them and at
/// `error` otherwise.
#[derive(Debug, Clone)]
pub struct TracingSink {
    slow_threshold: Option<Duration>,
}

impl TracingSink {
    /// Creates a sink with the default slow threshold.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slow_threshold: Some(DEFAULT_SLOW_THRESHOLD),
        }
    }

    /// Sets the slow threshold. A zero duration disables slow warnings.
    #[must_use]
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = if threshold.is_zero() {
            None
        } else {
            Some(threshold)
        };
        self
    }

    /// Returns the slow threshold, if enabled.
    #[must_use]
    pub const fn slow_threshold(&self) -> Option<Duration> {
        self.slow_threshold
    }

    fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_threshold
            .is_some_and(|threshold| elapsed > threshold)
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchSink for TracingSink {
    fn record(&self, event: &DispatchEvent) {
        let request = event.request.as_str();
        let response = event.response.as_str();
        let request_id = event.request_id;

        match &event.outcome {
            DispatchOutcome::Started => {
                tracing::info!(request, response, %request_id, "handling request");
            }
            DispatchOutcome::Completed { elapsed } => {
                let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
                if self.is_slow(*elapsed) {
                    tracing::warn!(request, response, %request_id, elapsed_ms, "slow request handled");
                } else {
                    tracing::info!(request, response, %request_id, elapsed_ms, "request handled");
                }
            }
            DispatchOutcome::Failed {
                elapsed,
                category,
                message,
                field_failures,
            } => {
                let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
                if category.is_client_error() {
                    tracing::warn!(
                        request,
                        response,
                        %request_id,
                        elapsed_ms,
                        category = category.as_str(),
                        field_failures,
                        error = %message,
                        "request failed"
                    );
                } else {
                    tracing::error!(
                        request,
                        response,
                        %request_id,
                        elapsed_ms,
                        category = category.as_str(),
                        error = %message,
                        "request failed"
                    );
                }
            }
        }
    }
}

/// Keeps every event in memory, for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<DispatchEvent>>>,
    rejections: Arc<Mutex<Vec<(String, Rejection)>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Returns the recorded validation rejections.
    #[must_use]
    pub fn rejections(&self) -> Vec<(String, Rejection)> {
        self.rejections.lock().clone()
    }

    /// Drops every recorded event and rejection.
    pub fn clear(&self) {
        self.events.lock().clear();
        self.rejections.lock().clear();
    }
}

impl DispatchSink for RecordingSink {
    fn record(&self, event: &DispatchEvent) {
        self.events.lock().push(event.clone());
    }

    fn rejected(&self, request: &str, rejection: Rejection) {
        self.rejections.lock().push((request.to_string(), rejection));
    }
}

/// The logging behavior.
#[derive(Clone)]
pub struct LoggingBehavior {
    sink: Arc<dyn DispatchSink>,
}

impl LoggingBehavior {
    /// Creates a logging behavior writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn DispatchSink>) -> Self {
        Self { sink }
    }
}

impl Default for LoggingBehavior {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink::new()))
    }
}

impl std::fmt::Debug for LoggingBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingBehavior").finish_non_exhaustive()
    }
}

impl Behavior for LoggingBehavior {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn invoke<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        message: Message,
        next: Next<'a>,
    ) -> BoxFuture<'a, HermesResult<Reply>> {
        Box::pin(async move {
            let descriptor = *message.descriptor();
            let event = |outcome| DispatchEvent {
                request: descriptor.request_name(),
                response: descriptor.response_name(),
                request_id: ctx.request_id(),
                outcome,
            };

            self.sink.record(&event(DispatchOutcome::Started));
            let pending = PendingDispatch {
                sink: self.sink.as_ref(),
                start: Instant::now(),
                event: Some(event(DispatchOutcome::Started)),
            };

            let result = next.run(ctx, message).await;
            pending.finish(&result);

            result
        })
    }
}

/// Owes the sink the closing event of one dispatch.
///
/// Dropped without [`finish`](Self::finish), it records a cancelled failure.
struct PendingDispatch<'a> {
    sink: &'a dyn DispatchSink,
    start: Instant,
    event: Option<DispatchEvent>,
}

impl PendingDispatch<'_> {
    fn finish(mut self, result: &HermesResult<Reply>) {
        let elapsed = self.start.elapsed();
        let outcome = match result {
            Ok(_) => DispatchOutcome::Completed { elapsed },
            Err(error) => failed(error, elapsed),
        };
        self.close(outcome);
    }

    fn close(&mut self, outcome: DispatchOutcome) {
        if let Some(mut event) = self.event.take() {
            event.outcome = outcome;
            self.sink.record(&event);
        }
    }
}

impl Drop for PendingDispatch<'_> {
    fn drop(&mut self) {
        if self.event.is_some() {
            let outcome = failed(&HermesError::Cancelled, self.start.elapsed());
            self.close(outcome);
        }
    }
}

fn failed(error: &HermesError, elapsed: Duration) -> DispatchOutcome {
    DispatchOutcome::Failed {
        elapsed,
        category: error.category(),
        message: error.to_string(),
        field_failures: error.field_failures().map_or(0, <[_]>::len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::handler::downcast_reply;
    use hermes_core::Request;

    struct Lookup(i32);

    struct Found(i32);

    impl Request for Lookup {
        type Response = Found;
    }

    fn ok_next<'a>() -> Next<'a> {
        Next::terminal(|message: Message| -> BoxFuture<'a, HermesResult<Reply>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(120)).await;
                let id = message.downcast_ref::<Lookup>().map_or(0, |l| l.0);
                Ok(Box::new(Found(id)) as Reply)
            })
        })
    }

    fn failing_next<'a>() -> Next<'a> {
        Next::terminal(|_message: Message| -> BoxFuture<'a, HermesResult<Reply>> {
            Box::pin(async { Err(HermesError::not_found("The user '42' could not be found.")) })
        })
    }

    fn pending_next<'a>() -> Next<'a> {
        Next::terminal(|_message: Message| -> BoxFuture<'a, HermesResult<Reply>> {
            Box::pin(std::future::pending::<HermesResult<Reply>>())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_passed_through_and_timed() {
        let sink = RecordingSink::new();
        let behavior = LoggingBehavior::new(Arc::new(sink.clone()));
        let ctx = DispatchContext::new();

        let reply = behavior
            .invoke(&ctx, Message::new(Lookup(9)), ok_next())
            .await
            .unwrap();
        assert_eq!(downcast_reply::<Lookup>(reply).unwrap().0, 9);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_started());
        assert_eq!(events[0].request, "Lookup");
        assert_eq!(events[0].response, "Found");
        assert_eq!(events[0].request_id, ctx.request_id());

        let elapsed = events[1].elapsed().unwrap();
        assert!(elapsed >= Duration::from_millis(120));
        assert!(matches!(events[1].outcome, DispatchOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn test_failure_is_passed_through_unchanged() {
        let sink = RecordingSink::new();
        let behavior = LoggingBehavior::new(Arc::new(sink.clone()));
        let ctx = DispatchContext::new();

        let result = behavior
            .invoke(&ctx, Message::new(Lookup(42)), failing_next())
            .await;
        match result {
            Err(HermesError::NotFound { message }) => {
                assert_eq!(message, "The user '42' could not be found.");
            }
            _ => panic!("expected NotFound"),
        }

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].category(), Some(ErrorCategory::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_dispatch_is_reported_as_cancelled() {
        let sink = RecordingSink::new();
        let behavior = LoggingBehavior::new(Arc::new(sink.clone()));
        let ctx = DispatchContext::new();

        let result = tokio::time::timeout(
            Duration::from_millis(30),
            behavior.invoke(&ctx, Message::new(Lookup(1)), pending_next()),
        )
        .await;
        assert!(result.is_err());

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_started());
        assert_eq!(events[1].category(), Some(ErrorCategory::Cancelled));
        assert_eq!(events[1].request_id, ctx.request_id());
        assert!(events[1].elapsed().unwrap() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_finished_dispatch_is_closed_once() {
        let sink = RecordingSink::new();
        let behavior = LoggingBehavior::new(Arc::new(sink.clone()));
        let ctx = DispatchContext::new();

        let _ = behavior
            .invoke(&ctx, Message::new(Lookup(42)), failing_next())
            .await;

        let closing: Vec<_> = sink.events().into_iter().filter(|e| !e.is_started()).collect();
        assert_eq!(closing.len(), 1);
        assert_eq!(closing[0].category(), Some(ErrorCategory::NotFound));
    }

    #[test]
    fn test_tracing_sink_slow_threshold() {
        let sink = TracingSink::new();
        assert_eq!(sink.slow_threshold(), Some(DEFAULT_SLOW_THRESHOLD));
        assert!(sink.is_slow(Duration::from_secs(1)));
        assert!(!sink.is_slow(Duration::from_millis(10)));

        let disabled = TracingSink::new().with_slow_threshold(Duration::ZERO);
        assert!(!disabled.is_slow(Duration::from_secs(60)));
    }

    #[test]
    fn test_failed_counts_field_failures() {
        let error = HermesError::validation(vec![
            hermes_core::FieldFailure::new("A", "x"),
            hermes_core::FieldFailure::new("B", "y"),
        ]);
        match failed(&error, Duration::ZERO) {
            DispatchOutcome::Failed {
                category,
                field_failures,
                ..
            } => {
                assert_eq!(category, ErrorCategory::Validation);
                assert_eq!(field_failures, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
