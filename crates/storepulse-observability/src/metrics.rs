//! Metrics collection with Prometheus
//!
//! Counters and histograms are fed from the structured traversal and cache
//! events through [`MetricsSink`]:
//! - Traversals by collection and stop reason
//! - Pages, fetched records and records rejected at ingestion
//! - Truncations, cursor stalls and failures
//! - Cache hits, misses, coalesced loads, discarded results and evictions

use prometheus::{
    CounterVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use storepulse_core::{CacheEvent, EventSink, TraversalEvent};

/// Metrics collector for StorePulse
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    // Traversal metrics
    /// Finished traversals
    pub traversals_total: CounterVec,
    /// Pages fetched successfully
    pub pages_total: CounterVec,
    /// Records accepted from pages, before deduplication
    pub records_fetched_total: CounterVec,
    /// Records dropped at ingestion
    pub records_rejected_total: CounterVec,
    /// Traversals that stopped with data left unread
    pub truncations_total: CounterVec,
    /// Servers echoing back the cursor they were sent
    pub cursor_stalls_total: CounterVec,
    /// Traversals aborted by an error
    pub traversal_failures_total: CounterVec,
    /// Wall-clock duration of finished traversals
    pub traversal_duration_seconds: HistogramVec,

    // Cache metrics
    /// Cache lookups and loads by outcome
    pub cache_events_total: CounterVec,
    /// Entries marked stale by invalidation
    pub cache_invalidated_entries_total: IntCounter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let traversals_total = CounterVec::new(
            Opts::new("storepulse_traversals_total", "Total number of finished traversals"),
            &["collection", "stop_reason"],
        )?;

        let pages_total = CounterVec::new(
            Opts::new("storepulse_pages_total", "Total number of pages fetched"),
            &["collection"],
        )?;

        let records_fetched_total = CounterVec::new(
            Opts::new(
                "storepulse_records_fetched_total",
                "Records accepted from fetched pages",
            ),
            &["collection"],
        )?;

        let records_rejected_total = CounterVec::new(
            Opts::new(
                "storepulse_records_rejected_total",
                "Records rejected as malformed at ingestion",
            ),
            &["collection"],
        )?;

        let truncations_total = CounterVec::new(
            Opts::new(
                "storepulse_truncations_total",
                "Traversals stopped before the collection was exhausted",
            ),
            &["collection", "stop_reason"],
        )?;

        let cursor_stalls_total = CounterVec::new(
            Opts::new(
                "storepulse_cursor_stalls_total",
                "Pages whose next cursor equalled the cursor sent",
            ),
            &["collection"],
        )?;

        let traversal_failures_total = CounterVec::new(
            Opts::new(
                "storepulse_traversal_failures_total",
                "Page requests that failed",
            ),
            &["collection", "error_kind"],
        )?;

        let traversal_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "storepulse_traversal_duration_seconds",
                "Traversal duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["collection"],
        )?;

        let cache_events_total = CounterVec::new(
            Opts::new("storepulse_cache_events_total", "Query cache events by outcome"),
            &["event"],
        )?;

        let cache_invalidated_entries_total = IntCounter::new(
            "storepulse_cache_invalidated_entries_total",
            "Cache entries marked stale by invalidation",
        )?;

        registry.register(Box::new(traversals_total.clone()))?;
        registry.register(Box::new(pages_total.clone()))?;
        registry.register(Box::new(records_fetched_total.clone()))?;
        registry.register(Box::new(records_rejected_total.clone()))?;
        registry.register(Box::new(truncations_total.clone()))?;
        registry.register(Box::new(cursor_stalls_total.clone()))?;
        registry.register(Box::new(traversal_failures_total.clone()))?;
        registry.register(Box::new(traversal_duration_seconds.clone()))?;
        registry.register(Box::new(cache_events_total.clone()))?;
        registry.register(Box::new(cache_invalidated_entries_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            traversals_total,
            pages_total,
            records_fetched_total,
            records_rejected_total,
            truncations_total,
            cursor_stalls_total,
            traversal_failures_total,
            traversal_duration_seconds,
            cache_events_total,
            cache_invalidated_entries_total,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every metric in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    /// Record one traversal or page event
    pub fn record_traversal(&self, event: &TraversalEvent) {
        match event {
            TraversalEvent::PageFetched {
                collection,
                items,
                rejected,
                ..
            } => {
                self.pages_total.with_label_values(&[collection]).inc();
                self.records_fetched_total
                    .with_label_values(&[collection])
                    .inc_by(*items as f64);
                if *rejected > 0 {
                    self.records_rejected_total
                        .with_label_values(&[collection])
                        .inc_by(*rejected as f64);
                }
            }
            TraversalEvent::CursorStall { collection, .. } => {
                self.cursor_stalls_total
                    .with_label_values(&[collection])
                    .inc();
            }
            TraversalEvent::Truncated { collection, stats } => {
                self.truncations_total
                    .with_label_values(&[collection.as_str(), stats.stop_reason.as_str()])
                    .inc();
            }
            TraversalEvent::Completed {
                collection,
                stats,
                elapsed,
            } => {
                self.traversals_total
                    .with_label_values(&[collection.as_str(), stats.stop_reason.as_str()])
                    .inc();
                self.traversal_duration_seconds
                    .with_label_values(&[collection])
                    .observe(elapsed.as_secs_f64());
            }
            TraversalEvent::Failed {
                collection,
                error_kind,
                ..
            } => {
                self.traversal_failures_total
                    .with_label_values(&[collection.as_str(), *error_kind])
                    .inc();
            }
        }
    }

    /// Record one cache event
    pub fn record_cache(&self, event: &CacheEvent) {
        let outcome = match event {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Coalesced { .. } => "coalesced",
            CacheEvent::StaleResultDiscarded { .. } => "stale_discarded",
            CacheEvent::Evicted { .. } => "evicted",
            CacheEvent::Invalidated { entries, .. } => {
                self.cache_invalidated_entries_total.inc_by(*entries as u64);
                "invalidated"
            }
        };
        self.cache_events_total.with_label_values(&[outcome]).inc();
    }
}

/// [`EventSink`] that counts events and forwards them to an optional next sink
#[derive(Clone)]
pub struct MetricsSink {
    metrics: Metrics,
    next: Option<Arc<dyn EventSink>>,
}

impl MetricsSink {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            next: None,
        }
    }

    /// Forward every event to `next` after counting it
    pub fn with_next(mut self, next: Arc<dyn EventSink>) -> Self {
        self.next = Some(next);
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl EventSink for MetricsSink {
    fn traversal(&self, event: &TraversalEvent) {
        self.metrics.record_traversal(event);
        if let Some(ref next) = self.next {
            next.traversal(event);
        }
    }

    fn cache(&self, event: &CacheEvent) {
        self.metrics.record_cache(event);
        if let Some(ref next) = self.next {
            next.cache(event);
        }
    }
}
