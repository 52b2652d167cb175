use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form event properties, serialized as a JSON object.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// The kinds of user interaction the tracker records.
///
/// Serialized in `snake_case`, which is the value of the `event` field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Search,
    FilterApplied,
    PageView,
    Pagination,
    DownloadClick,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Search => "search",
            EventKind::FilterApplied => "filter_applied",
            EventKind::PageView => "page_view",
            EventKind::Pagination => "pagination",
            EventKind::DownloadClick => "download_click",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded interaction.
///
/// Events are immutable once built. On the wire an event looks like:
/// `{
///   "event": "search",
///   "properties": { "query": "grid ea", "searchType": "global" },
///   "timestamp": "2024-05-01T10:00:00.000Z"
/// }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    event: EventKind,
    properties: Properties,
    #[serde(with = "iso8601_millis")]
    timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(kind: EventKind, properties: impl Into<Properties>, timestamp: DateTime<Utc>) -> Self {
        Self {
            event: kind,
            properties: properties.into(),
            timestamp,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Looks up a single property by its wire key.
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// Convenience accessor for string-valued properties.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

/// Largest number of events a single `POST /api/analytics/batch` may carry.
pub const MAX_BATCH_EVENTS: usize = 10;

/// The body of `POST /api/analytics/batch`, holding 1 to [`MAX_BATCH_EVENTS`] events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPayload {
    pub events: Vec<AnalyticsEvent>,
}

impl BatchPayload {
    pub fn new(events: Vec<AnalyticsEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Timestamps travel as RFC 3339 strings with millisecond precision and a `Z`
/// suffix, e.g. `2024-05-01T10:00:00.000Z`.
pub(crate) mod iso8601_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|_| serde::de::Error::custom(crate::EventsError::InvalidTimestamp(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_event_wire_shape() {
        let mut props = Properties::new();
        props.insert("query".into(), json!("grid ea"));
        let event = AnalyticsEvent::new(EventKind::Search, props, at(1_714_557_600));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "search",
                "properties": { "query": "grid ea" },
                "timestamp": "2024-05-01T10:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_kind_names_match_wire_names() {
        for kind in [
            EventKind::Search,
            EventKind::FilterApplied,
            EventKind::PageView,
            EventKind::Pagination,
            EventKind::DownloadClick,
        ] {
            let wire = serde_json::to_value(kind).unwrap();
            assert_eq!(wire, json!(kind.as_str()));
        }
    }

    #[test]
    fn test_batch_payload_parses_from_collector_body() {
        let body = r#"{"events":[
            {"event":"page_view","properties":{"page":"/blog"},"timestamp":"2024-05-01T10:00:00.250Z"},
            {"event":"download_click","properties":{"downloadId":"ea-7"},"timestamp":"2024-05-01T10:00:01Z"}
        ]}"#;
        let batch: BatchPayload = serde_json::from_str(body).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.events[0].kind(), EventKind::PageView);
        assert_eq!(batch.events[0].property_str("page"), Some("/blog"));
        assert_eq!(batch.events[0].timestamp().timestamp_subsec_millis(), 250);
        assert_eq!(batch.events[1].kind(), EventKind::DownloadClick);
    }

    #[test]
    fn test_rejects_malformed_timestamp() {
        let body = r#"{"event":"search","properties":{},"timestamp":"yesterday"}"#;
        let err = serde_json::from_str::<AnalyticsEvent>(body).unwrap_err();
        assert!(err.to_string().contains("yesterday"), "got: {err}");
    }
}
