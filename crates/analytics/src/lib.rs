//! # fxtools Analytics
//!
//! This crate records how visitors interact with the site (searches, filters,
//! page views, pagination, downloads) and forwards every interaction to the
//! analytics collector.
//!
//! ## Architectural Principles
//!
//! - **Explicit instance:** there is no global tracker. The application builds one
//!   `EventTracker` per session and hands clones of it to whoever needs it.
//! - **Fire-and-forget delivery:** `track_*` calls update in-memory state
//!   synchronously and deliver on spawned tasks. Delivery failures are logged,
//!   never returned.
//! - **Injected capabilities:** wall-clock time (`Clock`), the current page
//!   (`LocationProvider`) and delayed callbacks (`Scheduler`) are passed in, so
//!   tests never touch process globals.
//!
//! ## Public API
//!
//! - `EventTracker`: records events, serves the search/filter aggregates, and
//!   owns the batched delivery path.
//! - `Measured`: implemented by results that can be timed with `EventTracker::measure`.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
mod batch;
pub mod clock;
pub mod error;
pub mod location;
pub mod measure;
pub mod scheduler;
pub mod stats;
pub mod tracker;

// Re-export the key components to create a clean, public-facing API.
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::AnalyticsError;
pub use location::{LocationProvider, SharedLocation};
pub use measure::{Measured, PERFORMANCE_ERROR, PERFORMANCE_MEASURE};
pub use scheduler::{Scheduler, TimerCallback, TimerHandle, TokioScheduler};
pub use stats::PopularSearch;
pub use tracker::{EventTracker, TrackerBuilder, DEFAULT_LIMIT};
