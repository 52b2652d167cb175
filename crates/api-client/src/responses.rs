use serde::{Deserialize, Serialize};

/// The error body returned by the collector for a rejected request, e.g.
/// `{"error": "a batch carries between 1 and 10 events, got 0"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorErrorResponse {
    pub error: String,
}
