//! Timing of asynchronous operations, reported as search events.

use crate::tracker::EventTracker;
use events::Properties;
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Search type of the event emitted when a measured operation succeeds.
pub const PERFORMANCE_MEASURE: &str = "performance_measure";
/// Search type of the event emitted when a measured operation fails.
pub const PERFORMANCE_ERROR: &str = "performance_error";

/// A result that knows how many items it found.
pub trait Measured {
    fn total(&self) -> u64;
}

impl EventTracker {
    /// Awaits `operation` and records how long it took.
    ///
    /// On success a search for `name` is tracked with `resultsCount` set to the
    /// result's total and `filters.duration` in milliseconds. On failure the
    /// tracked search has `resultsCount` 0 and also carries `filters.error`, and
    /// the error is returned to the caller unchanged.
    pub async fn measure<F, T, E>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        T: Measured,
        E: Display,
    {
        let started = Instant::now();
        let result = operation.await;
        let duration = round_millis(started.elapsed());

        let mut filters = Properties::new();
        filters.insert("duration".into(), Value::from(duration));

        match &result {
            Ok(value) => {
                self.track_search(name, Some(value.total()), Some(PERFORMANCE_MEASURE), Some(filters));
            }
            Err(e) => {
                filters.insert("error".into(), Value::String(e.to_string()));
                self.track_search(name, Some(0), Some(PERFORMANCE_ERROR), Some(filters));
            }
        }

        result
    }
}

fn round_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::InMemorySink;
    use events::EventKind;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug)]
    struct SignalPage {
        total: u64,
    }

    impl Measured for SignalPage {
        fn total(&self) -> u64 {
            self.total
        }
    }

    #[derive(Debug, PartialEq)]
    struct UpstreamDown;

    impl Display for UpstreamDown {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("signals API unavailable")
        }
    }

    fn tracker() -> (EventTracker, InMemorySink) {
        let sink = InMemorySink::new();
        let tracker = EventTracker::builder(Arc::new(sink.clone())).build().unwrap();
        (tracker, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_records_total_and_duration() {
        let (tracker, sink) = tracker();

        let page = tracker
            .measure("load_signals", async {
                tokio::time::sleep(Duration::from_millis(250)).await;
                Ok::<_, UpstreamDown>(SignalPage { total: 42 })
            })
            .await
            .unwrap();
        assert_eq!(page.total, 42);

        let events = tracker.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.kind(), EventKind::Search);
        assert_eq!(event.property_str("query"), Some("load_signals"));
        assert_eq!(event.property_str("searchType"), Some(PERFORMANCE_MEASURE));
        assert_eq!(event.property("resultsCount"), Some(&json!(42)));

        let duration = event.property("filters").unwrap()["duration"].as_u64().unwrap();
        assert!((250..=260).contains(&duration), "duration was {duration}");

        tracker.settle().await;
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_recorded_then_returned() {
        let (tracker, _sink) = tracker();

        let result = tracker
            .measure("load_signals", async {
                tokio::time::sleep(Duration::from_millis(80)).await;
                Err::<SignalPage, _>(UpstreamDown)
            })
            .await;
        assert_eq!(result.unwrap_err(), UpstreamDown);

        let events = tracker.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.property_str("searchType"), Some(PERFORMANCE_ERROR));
        assert_eq!(event.property("resultsCount"), Some(&json!(0)));

        let filters = event.property("filters").unwrap();
        assert_eq!(filters["error"], json!("signals API unavailable"));
        assert!(filters["duration"].as_u64().unwrap() >= 80);
    }

    #[test]
    fn test_round_millis() {
        assert_eq!(round_millis(Duration::from_micros(1_400)), 1);
        assert_eq!(round_millis(Duration::from_micros(1_600)), 2);
        assert_eq!(round_millis(Duration::ZERO), 0);
    }
}
