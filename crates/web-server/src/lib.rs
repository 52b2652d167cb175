//! A development collector for the site's analytics endpoints.
//!
//! It accepts exactly the payloads the tracker posts and keeps them in memory,
//! so the tracking pipeline can be exercised end to end without the production API.

use axum::{
    routing::{get, post},
    Router,
};
use events::{AnalyticsEvent, EventKind};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

pub use events::MAX_BATCH_EVENTS;

/// Every event received since startup, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Arc<RwLock<Vec<AnalyticsEvent>>>,
}

/// Counts of stored events, overall and per kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
}

impl EventStore {
    pub fn push(&self, event: AnalyticsEvent) {
        self.events.write().push(event);
    }

    pub fn extend(&self, events: impl IntoIterator<Item = AnalyticsEvent>) {
        self.events.write().extend(events);
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.read().clone()
    }

    pub fn summary(&self) -> EventSummary {
        let events = self.events.read();
        let mut by_kind = BTreeMap::new();
        for event in events.iter() {
            *by_kind.entry(event.kind().as_str().to_string()).or_insert(0) += 1;
        }
        EventSummary {
            total: events.len(),
            by_kind,
        }
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events.read().iter().filter(|e| e.kind() == kind).count()
    }
}

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: EventStore,
}

/// Builds the collector's routes on top of `store`.
pub fn router(store: EventStore) -> Router {
    let app_state = Arc::new(AppState { store });
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/analytics", post(handlers::collect_event))
        .route("/api/analytics/batch", post(handlers::collect_batch))
        .route("/api/analytics/events", get(handlers::list_events))
        .route("/api/analytics/summary", get(handlers::get_summary))
        .with_state(app_state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
}

/// Serves the collector on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener, store: EventStore) -> anyhow::Result<()> {
    let app = router(store);
    axum::serve(listener, app).await?;
    Ok(())
}

/// The main function to configure and run the collector.
pub async fn run_server(addr: SocketAddr) -> anyhow::Result<()> {
    // Note: Tracing is already initialized by the binary, so we don't initialize it here.
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Analytics collector listening on http://{}", listener.local_addr()?);
    serve(listener, EventStore::default()).await
}
