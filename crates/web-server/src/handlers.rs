use crate::{error::AppError, AppState, EventSummary, MAX_BATCH_EVENTS};
use axum::{extract::State, http::StatusCode, Json};
use events::{AnalyticsEvent, BatchPayload};
use std::sync::Arc;

/// # POST /api/analytics
pub async fn collect_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AnalyticsEvent>,
) -> StatusCode {
    tracing::debug!(kind = %event.kind(), "Collected event.");
    state.store.push(event);
    StatusCode::ACCEPTED
}

/// # POST /api/analytics/batch
/// Accepts between 1 and `MAX_BATCH_EVENTS` events in one payload.
pub async fn collect_batch(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<BatchPayload>,
) -> Result<StatusCode, AppError> {
    if batch.is_empty() || batch.len() > MAX_BATCH_EVENTS {
        return Err(AppError::InvalidBatch(format!(
            "a batch carries between 1 and {} events, got {}",
            MAX_BATCH_EVENTS,
            batch.len()
        )));
    }
    tracing::debug!(size = batch.len(), "Collected batch.");
    state.store.extend(batch.events);
    Ok(StatusCode::ACCEPTED)
}

/// # GET /api/analytics/events
pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<Vec<AnalyticsEvent>> {
    Json(state.store.events())
}

/// # GET /api/analytics/summary
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<EventSummary> {
    Json(state.store.summary())
}
