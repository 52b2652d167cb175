use crate::batch::{BatchQueue, Enqueued};
use crate::clock::{Clock, SystemClock};
use crate::error::AnalyticsError;
use crate::location::{LocationProvider, SharedLocation};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::stats::{PopularSearch, SearchStats};
use api_client::AnalyticsSink;
use configuration::TrackingConfig;
use events::{
    AnalyticsEvent, BatchPayload, DownloadProperties, EventKind, FilterProperties,
    PageViewProperties, PaginationProperties, Properties, SearchProperties, DEFAULT_SEARCH_TYPE,
    MAX_BATCH_EVENTS,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Number of entries the history and popularity views return by default.
pub const DEFAULT_LIMIT: usize = 10;

/// Everything a tracker knows about the session. Guarded by a single lock so
/// that a search lands in the log, the history and the counts together.
struct TrackerState {
    events: Vec<AnalyticsEvent>,
    searches: SearchStats,
    batch: BatchQueue,
}

struct Inner {
    sink: Arc<dyn AnalyticsSink>,
    clock: Arc<dyn Clock>,
    location: Arc<dyn LocationProvider>,
    scheduler: Arc<dyn Scheduler>,
    delivery_enabled: bool,
    state: Mutex<TrackerState>,
    /// Delivery tasks that may still be running.
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

/// Records visitor interactions and forwards them to the analytics collector.
///
/// Cloning is cheap and every clone shares the same log, so one tracker built at
/// session start can be handed to every component that reports interactions.
#[derive(Clone)]
pub struct EventTracker {
    inner: Arc<Inner>,
}

/// Assembles an [`EventTracker`]. Anything not set falls back to the system
/// clock, the tokio scheduler, `about:blank` as location, and batches of 10
/// events flushed after at most 5 seconds.
pub struct TrackerBuilder {
    sink: Arc<dyn AnalyticsSink>,
    clock: Option<Arc<dyn Clock>>,
    location: Option<Arc<dyn LocationProvider>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    batch_size: usize,
    batch_delay: Duration,
    delivery_enabled: bool,
}

impl TrackerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn location(mut self, location: Arc<dyn LocationProvider>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    /// With delivery disabled, events are still recorded but never sent.
    pub fn delivery_enabled(mut self, enabled: bool) -> Self {
        self.delivery_enabled = enabled;
        self
    }

    /// A batch size outside `1..=MAX_BATCH_EVENTS` is clamped into that range.
    pub fn build(self) -> Result<EventTracker, AnalyticsError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_EVENTS {
            tracing::warn!(
                requested = self.batch_size,
                max = MAX_BATCH_EVENTS,
                "Batch size out of range; clamping."
            );
        }
        let location: Arc<dyn LocationProvider> = match self.location {
            Some(location) => location,
            None => Arc::new(SharedLocation::new("about:blank")?),
        };

        Ok(EventTracker {
            inner: Arc::new(Inner {
                sink: self.sink,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                location,
                scheduler: self.scheduler.unwrap_or_else(|| Arc::new(TokioScheduler)),
                delivery_enabled: self.delivery_enabled,
                state: Mutex::new(TrackerState {
                    events: Vec::new(),
                    searches: SearchStats::default(),
                    batch: BatchQueue::new(self.batch_size, self.batch_delay),
                }),
                in_flight: Mutex::new(Vec::new()),
            }),
        })
    }
}

impl EventTracker {
    pub fn builder(sink: Arc<dyn AnalyticsSink>) -> TrackerBuilder {
        TrackerBuilder {
            sink,
            clock: None,
            location: None,
            scheduler: None,
            batch_size: 10,
            batch_delay: Duration::from_secs(5),
            delivery_enabled: true,
        }
    }

    /// Builds a tracker from the `[tracking]` settings.
    ///
    /// The returned location is the one the tracker reads; the application calls
    /// `navigate` on it as the visitor moves around.
    pub fn from_config(
        config: &TrackingConfig,
        sink: Arc<dyn AnalyticsSink>,
    ) -> Result<(Self, Arc<SharedLocation>), AnalyticsError> {
        let location = Arc::new(SharedLocation::new(&config.location)?);
        let tracker = Self::builder(sink)
            .location(location.clone())
            .batch_size(config.batch_size)
            .batch_delay(config.batch_delay)
            .delivery_enabled(config.enabled)
            .build()?;
        Ok((tracker, location))
    }

    // --- Tracking ---

    /// Records a search. The search type defaults to `"global"`.
    pub fn track_search(
        &self,
        query: &str,
        results_count: Option<u64>,
        search_type: Option<&str>,
        filters: Option<Properties>,
    ) {
        let properties = SearchProperties {
            query: query.to_string(),
            results_count,
            search_type: search_type.unwrap_or(DEFAULT_SEARCH_TYPE).to_string(),
            filters,
        };
        let event = AnalyticsEvent::new(EventKind::Search, properties, self.inner.clock.now());

        {
            let mut state = self.inner.state.lock();
            state.events.push(event.clone());
            state.searches.record(query);
        }

        self.deliver(event);
    }

    /// Records a filter selection. `page` defaults to the current location path.
    pub fn track_filter(
        &self,
        filter_type: &str,
        filter_value: impl Into<serde_json::Value>,
        page: Option<&str>,
    ) {
        let properties = FilterProperties {
            filter_type: filter_type.to_string(),
            filter_value: filter_value.into(),
            page: page.map_or_else(|| self.inner.location.path(), str::to_string),
        };
        self.record(EventKind::FilterApplied, properties.into());
    }

    pub fn track_page_view(&self, page: &str, properties: Option<Properties>) {
        let properties = PageViewProperties {
            page: page.to_string(),
            extra: properties.unwrap_or_default(),
        };
        self.record(EventKind::PageView, properties.into());
    }

    /// Records a pagination step together with the current full URL.
    pub fn track_pagination(&self, page: u64, items_per_page: u64, total_items: u64) {
        let properties = PaginationProperties {
            page,
            items_per_page,
            total_items,
            url: self.inner.location.href(),
        };
        self.record(EventKind::Pagination, properties.into());
    }

    pub fn track_download(&self, download_id: &str, download_name: &str) {
        let properties = DownloadProperties {
            download_id: download_id.to_string(),
            download_name: download_name.to_string(),
        };
        self.record(EventKind::DownloadClick, properties.into());
    }

    fn record(&self, kind: EventKind, properties: Properties) {
        let event = AnalyticsEvent::new(kind, properties, self.inner.clock.now());
        self.inner.state.lock().events.push(event.clone());
        self.deliver(event);
    }

    // --- Read side ---

    /// The last `limit` searched queries, most recent last.
    pub fn search_history(&self, limit: usize) -> Vec<String> {
        self.inner.state.lock().searches.history(limit)
    }

    /// Up to `limit` queries ordered by how often they were searched.
    pub fn popular_searches(&self, limit: usize) -> Vec<PopularSearch> {
        self.inner.state.lock().searches.popular(limit)
    }

    /// How many times `query` has been searched.
    pub fn search_count(&self, query: &str) -> u64 {
        self.inner.state.lock().searches.count_of(query)
    }

    /// Number of recorded filter selections per filter type.
    ///
    /// Recomputed from the event log on every call.
    pub fn filter_usage_stats(&self) -> BTreeMap<String, usize> {
        let state = self.inner.state.lock();
        let mut usage = BTreeMap::new();
        for event in state.events.iter().filter(|e| e.kind() == EventKind::FilterApplied) {
            if let Some(filter_type) = event.property_str("filterType") {
                *usage.entry(filter_type.to_string()).or_insert(0) += 1;
            }
        }
        usage
    }

    /// A copy of every event recorded so far, in order.
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.inner.state.lock().events.clone()
    }

    pub fn pending_batch_len(&self) -> usize {
        self.inner.state.lock().batch.len()
    }

    /// When the pending batch is due, if there is one.
    pub fn batch_deadline(&self) -> Option<Instant> {
        self.inner.state.lock().batch.deadline()
    }

    // --- Delivery ---

    fn deliver(&self, event: AnalyticsEvent) {
        if !self.inner.delivery_enabled {
            return;
        }
        let sink = Arc::clone(&self.inner.sink);
        self.spawn_delivery(async move {
            if let Err(e) = sink.send_event(&event).await {
                tracing::warn!(error = %e, kind = %event.kind(), "Failed to deliver analytics event.");
            }
        });
    }

    /// Queues `event` on the batched path.
    ///
    /// The first event of a batch arms the delay timer. The batch is sent as soon
    /// as it is full or the timer fires, whichever comes first. If the scheduler
    /// cannot arm a timer, the batch is sent right away.
    pub fn enqueue_batched(&self, event: AnalyticsEvent) {
        let outcome = self.inner.state.lock().batch.enqueue(event, Instant::now());
        match outcome {
            Enqueued::Queued => {}
            Enqueued::Flush(events) => self.send_batch(events),
            Enqueued::Arm { generation, delay } => self.arm_timer(generation, delay),
        }
    }

    /// Sends the pending batch now. Does nothing when no batch is pending.
    pub fn flush_batch(&self) {
        let pending = self.inner.state.lock().batch.take();
        if let Some(events) = pending {
            self.send_batch(events);
        }
    }

    /// Flushes the pending batch and waits for every delivery still in flight.
    ///
    /// Delivery outcomes are only logged, as everywhere else.
    pub async fn settle(&self) {
        self.flush_batch();
        loop {
            let tasks = std::mem::take(&mut *self.inner.in_flight.lock());
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::debug!(error = %e, "Delivery task ended abnormally.");
                }
            }
        }
    }

    fn arm_timer(&self, generation: u64, delay: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let callback = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                EventTracker { inner }.on_timer(generation);
            }
        });

        // The lock is not held while scheduling, so a scheduler that fires
        // immediately cannot deadlock.
        match self.inner.scheduler.schedule(delay, callback) {
            Some(handle) => self.inner.state.lock().batch.attach_timer(generation, handle),
            None => {
                tracing::warn!("No timer available; flushing the batch without delay.");
                // Back to idle, so the next event tries to arm a timer again.
                self.on_timer(generation);
            }
        }
    }

    fn on_timer(&self, generation: u64) {
        let due = self.inner.state.lock().batch.fire(generation);
        if let Some(events) = due {
            self.send_batch(events);
        }
    }

    fn send_batch(&self, events: Vec<AnalyticsEvent>) {
        if events.is_empty() {
            return;
        }
        if !self.inner.delivery_enabled {
            tracing::debug!(size = events.len(), "Delivery disabled; dropping batch.");
            return;
        }
        let sink = Arc::clone(&self.inner.sink);
        let batch = BatchPayload::new(events);
        self.spawn_delivery(async move {
            if let Err(e) = sink.send_batch(&batch).await {
                tracing::warn!(error = %e, size = batch.len(), "Failed to deliver analytics batch.");
            }
        });
    }

    fn spawn_delivery<F>(&self, delivery: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("No async runtime available; analytics delivery skipped.");
            return;
        };
        let task = runtime.spawn(delivery);

        let mut in_flight = self.inner.in_flight.lock();
        in_flight.retain(|t| !t.is_finished());
        in_flight.push(task);
    }
}
