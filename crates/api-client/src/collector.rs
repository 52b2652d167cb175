use crate::error::ApiError;
use crate::responses::CollectorErrorResponse;
use crate::AnalyticsSink;
use async_trait::async_trait;
use configuration::CollectorConfig;
use events::{AnalyticsEvent, BatchPayload};
use reqwest::Url;
use serde::Serialize;

/// Route receiving one event per request.
pub const EVENT_PATH: &str = "/api/analytics";
/// Route receiving a grouped `{"events": [...]}` payload.
pub const BATCH_PATH: &str = "/api/analytics/batch";

/// A concrete implementation of the `AnalyticsSink` that posts JSON to the site API.
#[derive(Clone)]
pub struct HttpCollector {
    client: reqwest::Client,
    event_url: Url,
    batch_url: Url,
}

impl HttpCollector {
    pub fn new(config: &CollectorConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Self::with_client(client, &config.base_url)
    }

    /// Builds a collector on top of an existing `reqwest::Client`.
    ///
    /// `base_url` may carry a path prefix (e.g. a site served under `/app`);
    /// the analytics routes are appended to it.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base = base_url.trim_end_matches('/');
        let parse = |path: &str| {
            let raw = format!("{}{}", base, path);
            Url::parse(&raw).map_err(|_| ApiError::InvalidUrl(raw))
        };

        Ok(Self {
            event_url: parse(EVENT_PATH)?,
            batch_url: parse(BATCH_PATH)?,
            client,
        })
    }

    pub fn event_url(&self) -> &Url {
        &self.event_url
    }

    pub fn batch_url(&self) -> &Url {
        &self.batch_url
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &Url, body: &T) -> Result<(), ApiError> {
        let response = self.client.post(url.clone()).json(body).send().await?;
        let status = response.status();
        tracing::debug!(%url, status = status.as_u16(), "Collector responded.");

        if status.is_success() {
            return Ok(());
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to decode error response".to_string());
        // Prefer the collector's structured message, fall back to the raw body.
        let message = serde_json::from_str::<CollectorErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or(text);

        Err(ApiError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl AnalyticsSink for HttpCollector {
    async fn send_event(&self, event: &AnalyticsEvent) -> Result<(), ApiError> {
        self.post_json(&self.event_url, event).await
    }

    async fn send_batch(&self, batch: &BatchPayload) -> Result<(), ApiError> {
        self.post_json(&self.batch_url, batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use events::{EventKind, SearchProperties};
    use std::time::Duration;
    use web_server::EventStore;

    async fn spawn_collector() -> (String, EventStore) {
        let store = EventStore::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(web_server::serve(listener, store.clone()));
        (format!("http://{}", addr), store)
    }

    fn collector_for(base_url: &str) -> HttpCollector {
        let config = CollectorConfig {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
        };
        HttpCollector::new(&config).unwrap()
    }

    fn search_event(query: &str) -> AnalyticsEvent {
        AnalyticsEvent::new(EventKind::Search, SearchProperties::new(query), Utc::now())
    }

    #[test]
    fn test_routes_keep_base_path_prefix() {
        let collector = collector_for("https://fxtools.example/app/");
        assert_eq!(collector.event_url().as_str(), "https://fxtools.example/app/api/analytics");
        assert_eq!(
            collector.batch_url().as_str(),
            "https://fxtools.example/app/api/analytics/batch"
        );
    }

    #[test]
    fn test_rejects_unparseable_base_url() {
        let result = HttpCollector::with_client(reqwest::Client::new(), "not a url");
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_send_event_reaches_collector() {
        let (base_url, store) = spawn_collector().await;
        let collector = collector_for(&base_url);

        collector.send_event(&search_event("gold ea")).await.unwrap();

        let received = store.events();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind(), EventKind::Search);
        assert_eq!(received[0].property_str("query"), Some("gold ea"));
    }

    #[tokio::test]
    async fn test_send_batch_reaches_collector() {
        let (base_url, store) = spawn_collector().await;
        let collector = collector_for(&base_url);
        let batch = BatchPayload::new(vec![search_event("a"), search_event("b"), search_event("c")]);

        collector.send_batch(&batch).await.unwrap();

        let queries: Vec<_> = store
            .events()
            .iter()
            .map(|e| e.property_str("query").unwrap_or_default().to_string())
            .collect();
        assert_eq!(queries, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_rejected_batch_surfaces_status_and_message() {
        let (base_url, store) = spawn_collector().await;
        let collector = collector_for(&base_url);

        let err = collector.send_batch(&BatchPayload::new(Vec::new())).await.unwrap_err();

        match err {
            ApiError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("between 1 and 10"), "got: {message}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_collector_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let collector = collector_for(&format!("http://{}", addr));

        let err = collector.send_event(&search_event("x")).await.unwrap_err();
        assert!(matches!(err, ApiError::RequestBuild(_)), "got: {err}");
    }
}
