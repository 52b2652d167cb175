use crate::error::ApiError;
use async_trait::async_trait;
use events::{AnalyticsEvent, BatchPayload};

pub mod collector;
pub mod error;
pub mod memory;
pub mod responses;
// --- Public API ---
pub use collector::{HttpCollector, BATCH_PATH, EVENT_PATH};
pub use memory::InMemorySink;
pub use responses::CollectorErrorResponse;
pub use reqwest::Url;

/// The abstract interface for delivering tracked events to a collector.
/// This trait is the contract the tracker uses, allowing the underlying
/// implementation (HTTP or in-memory) to be swapped out.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Delivers a single event (`POST /api/analytics`).
    async fn send_event(&self, event: &AnalyticsEvent) -> Result<(), ApiError>;

    /// Delivers a group of events in one request (`POST /api/analytics/batch`).
    async fn send_batch(&self, batch: &BatchPayload) -> Result<(), ApiError>;
}
