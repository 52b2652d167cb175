//! # fxtools Events
//!
//! This crate defines the interaction events recorded by the site's analytics
//! tracker and the JSON payloads posted to the collection endpoints.
//!
//! As a Layer 0 crate, it depends on no other workspace crate and provides the
//! definitive wire language shared by the tracker, the HTTP client and the
//! development collector.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;
pub mod properties;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{AnalyticsEvent, BatchPayload, EventKind, Properties, MAX_BATCH_EVENTS};
pub use properties::{
    DownloadProperties, FilterProperties, PageViewProperties, PaginationProperties,
    SearchProperties, DEFAULT_SEARCH_TYPE,
};
