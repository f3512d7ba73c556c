//! Dispatch sink that logs and records metrics.

use std::time::Duration;

use hermes_pipeline::{DispatchEvent, DispatchOutcome, DispatchSink, Rejection, TracingSink};

use crate::metrics;

/// Writes dispatch events to `tracing` and the `metrics` facade.
///
/// Start events raise the in-flight gauge; the matching completion or failure
/// lowers it and records the dispatch counter and latency. Requests rejected
/// by the validation stage also count their failures; not-found errors raised
/// by handlers do not.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySink {
    logs: TracingSink,
}

impl TelemetrySink {
    /// Creates a sink with the default slow threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slow threshold of the log output. Zero disables it.
    #[must_use]
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.logs = self.logs.with_slow_threshold(threshold);
        self
    }

    /// Returns the slow threshold, if enabled.
    #[must_use]
    pub const fn slow_threshold(&self) -> Option<Duration> {
        self.logs.slow_threshold()
    }
}

impl DispatchSink for TelemetrySink {
    fn record(&self, event: &DispatchEvent) {
        match &event.outcome {
            DispatchOutcome::Started => metrics::increment_in_flight(),
            DispatchOutcome::Completed { elapsed } => {
                metrics::decrement_in_flight();
                metrics::record_dispatch(&event.request, "ok", *elapsed);
            }
            DispatchOutcome::Failed {
                elapsed, category, ..
            } => {
                metrics::decrement_in_flight();
                metrics::record_dispatch(&event.request, category.as_str(), *elapsed);
            }
        }

        self.logs.record(event);
    }

    fn rejected(&self, request: &str, rejection: Rejection) {
        metrics::record_validation_failures(request, rejection.kind(), rejection.count() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{ErrorCategory, RequestId};
    use metrics_exporter_prometheus::PrometheusBuilder;

    fn event(outcome: DispatchOutcome) -> DispatchEvent {
        DispatchEvent {
            request: "CreateUserCommand".to_string(),
            response: "UserDto".to_string(),
            request_id: RequestId::new(),
            outcome,
        }
    }

    fn render(sink: &TelemetrySink, events: &[DispatchEvent]) -> String {
        render_with(|| {
            for event in events {
                sink.record(event);
            }
        })
    }

    fn render_with(f: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        ::metrics::with_local_recorder(&recorder, f);
        handle.render()
    }

    fn sample(text: &str, name: &str) -> Option<f64> {
        text.lines()
            .filter(|line| !line.starts_with('#'))
            .find(|line| line.starts_with(name))
            .and_then(|line| line.rsplit(' ').next())
            .and_then(|value| value.parse().ok())
    }

    #[test]
    fn test_completed_dispatch() {
        let text = render(
            &TelemetrySink::new(),
            &[
                event(DispatchOutcome::Started),
                event(DispatchOutcome::Completed {
                    elapsed: Duration::from_millis(40),
                }),
            ],
        );
        assert!(text.contains(r#"outcome="ok""#));
        assert!(text.contains(crate::metrics::DISPATCH_DURATION));
        assert!(!text.contains(crate::metrics::VALIDATION_FAILURES));
    }

    #[test]
    fn test_rejected_dispatch_counts_failures() {
        let sink = TelemetrySink::new();
        let text = render_with(|| {
            sink.record(&event(DispatchOutcome::Started));
            sink.rejected("CreateUserCommand", Rejection::Invalid { failures: 2 });
            sink.record(&event(DispatchOutcome::Failed {
                elapsed: Duration::from_millis(2),
                category: ErrorCategory::Validation,
                message: "validation failed".to_string(),
                field_failures: 2,
            }));
        });
        assert!(text.contains(r#"outcome="validation""#));
        assert!(text.contains(r#"kind="invalid""#));
        assert_eq!(sample(&text, crate::metrics::VALIDATION_FAILURES), Some(2.0));
    }

    #[test]
    fn test_rejected_as_not_found_counts_once() {
        let text = render_with(|| {
            TelemetrySink::new().rejected("UpdateUserCommand", Rejection::NotFound);
        });
        assert!(text.contains(r#"kind="not_found""#));
        assert_eq!(sample(&text, crate::metrics::VALIDATION_FAILURES), Some(1.0));
    }

    #[test]
    fn test_handler_not_found_is_not_a_validation_failure() {
        let text = render(
            &TelemetrySink::new(),
            &[
                event(DispatchOutcome::Started),
                event(DispatchOutcome::Failed {
                    elapsed: Duration::ZERO,
                    category: ErrorCategory::NotFound,
                    message: "The user '42' could not be found.".to_string(),
                    field_failures: 0,
                }),
            ],
        );
        assert!(text.contains(r#"outcome="not_found""#));
        assert!(!text.contains(crate::metrics::VALIDATION_FAILURES));
    }

    #[test]
    fn test_cancelled_dispatch_lowers_in_flight_gauge() {
        let text = render(
            &TelemetrySink::new(),
            &[
                event(DispatchOutcome::Started),
                event(DispatchOutcome::Failed {
                    elapsed: Duration::from_millis(20),
                    category: ErrorCategory::Cancelled,
                    message: "dispatch cancelled".to_string(),
                    field_failures: 0,
                }),
            ],
        );
        assert_eq!(sample(&text, crate::metrics::IN_FLIGHT), Some(0.0));
        assert!(text.contains(r#"outcome="cancelled""#));
    }

    #[test]
    fn test_slow_threshold_is_forwarded() {
        let sink = TelemetrySink::new().with_slow_threshold(Duration::from_secs(2));
        assert_eq!(sink.slow_threshold(), Some(Duration::from_secs(2)));
        assert_eq!(
            TelemetrySink::new()
                .with_slow_threshold(Duration::ZERO)
                .slow_threshold(),
            None
        );
    }
}
