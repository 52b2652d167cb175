//! An in-memory sink that stores deliveries for later inspection.
//!
//! Primarily intended for tests and for running the tracker with delivery
//! pointed at nothing in particular. It can be switched into a failing mode to
//! exercise the tracker's error swallowing.

use crate::error::ApiError;
use crate::AnalyticsSink;
use async_trait::async_trait;
use events::{AnalyticsEvent, BatchPayload};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Deliveries {
    events: Vec<AnalyticsEvent>,
    batches: Vec<BatchPayload>,
    failure: Option<String>,
    attempts: usize,
}

/// Cloning yields another handle to the same buffers.
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    inner: Arc<Mutex<Deliveries>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every delivery fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let sink = Self::default();
        sink.set_failure(Some(message.into()));
        sink
    }

    /// Switches failure mode on (`Some`) or off (`None`).
    pub fn set_failure(&self, message: Option<String>) {
        self.inner.lock().failure = message;
    }

    /// Single events accepted so far, in arrival order.
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.inner.lock().events.clone()
    }

    /// Batches accepted so far, in arrival order.
    pub fn batches(&self) -> Vec<BatchPayload> {
        self.inner.lock().batches.clone()
    }

    /// Number of deliveries attempted, including failed ones.
    pub fn attempts(&self) -> usize {
        self.inner.lock().attempts
    }
}

#[async_trait]
impl AnalyticsSink for InMemorySink {
    async fn send_event(&self, event: &AnalyticsEvent) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.attempts += 1;
        if let Some(message) = &inner.failure {
            return Err(ApiError::Rejected(message.clone()));
        }
        inner.events.push(event.clone());
        Ok(())
    }

    async fn send_batch(&self, batch: &BatchPayload) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.attempts += 1;
        if let Some(message) = &inner.failure {
            return Err(ApiError::Rejected(message.clone()));
        }
        inner.batches.push(batch.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use events::{EventKind, Properties};

    fn event() -> AnalyticsEvent {
        AnalyticsEvent::new(EventKind::PageView, Properties::new(), Utc::now())
    }

    #[tokio::test]
    async fn test_records_events_and_batches_separately() {
        let sink = InMemorySink::new();
        sink.send_event(&event()).await.unwrap();
        sink.send_batch(&BatchPayload::new(vec![event(), event()])).await.unwrap();

        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.batches().len(), 1);
        assert_eq!(sink.batches()[0].len(), 2);
        assert_eq!(sink.attempts(), 2);
    }

    #[tokio::test]
    async fn test_failing_sink_counts_attempts_but_stores_nothing() {
        let sink = InMemorySink::failing("collector down");
        let err = sink.send_event(&event()).await.unwrap_err();

        assert!(err.to_string().contains("collector down"));
        assert_eq!(sink.attempts(), 1);
        assert!(sink.events().is_empty());
    }
}
