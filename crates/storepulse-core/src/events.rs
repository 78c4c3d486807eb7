//! Traversal and cache events
//!
//! Diagnostics are emitted as discrete structured events to an injected
//! [`EventSink`] rather than as free-text log lines. [`TracingSink`] turns them
//! into `tracing` records; the observability crate counts them in Prometheus.

use crate::cursor::CompositeCursor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Why a traversal stopped issuing page requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The server returned no next cursor
    Exhausted,
    /// `max_pages` reached with more data available
    PageLimit,
    /// `max_items` reached with more data available
    ItemLimit,
    /// The server echoed back the cursor it was sent
    CursorStall,
    /// A page could not be parsed
    MalformedPage,
}

impl StopReason {
    /// Every reason except natural exhaustion leaves data unread
    pub fn is_truncation(self) -> bool {
        !matches!(self, StopReason::Exhausted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Exhausted => "exhausted",
            StopReason::PageLimit => "page_limit",
            StopReason::ItemLimit => "item_limit",
            StopReason::CursorStall => "cursor_stall",
            StopReason::MalformedPage => "malformed_page",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing how complete a traversal was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    /// `true` when aggregates are a lower bound rather than the full truth
    pub truncated: bool,
    /// Page requests that returned successfully
    pub page_count: usize,
    /// Records accumulated before deduplication
    pub total_fetched: usize,
    /// Records left after deduplication
    pub unique_count: usize,
    /// Records dropped at ingestion
    pub rejected: usize,
    pub stop_reason: StopReason,
}

impl TraversalStats {
    pub fn empty() -> Self {
        Self {
            truncated: false,
            page_count: 0,
            total_fetched: 0,
            unique_count: 0,
            rejected: 0,
            stop_reason: StopReason::Exhausted,
        }
    }
}

impl Default for TraversalStats {
    fn default() -> Self {
        Self::empty()
    }
}

/// Events emitted by the pagination driver
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalEvent {
    PageFetched {
        collection: String,
        page: usize,
        items: usize,
        rejected: usize,
    },
    CursorStall {
        collection: String,
        page: usize,
        cursor: CompositeCursor,
    },
    Truncated {
        collection: String,
        stats: TraversalStats,
    },
    Completed {
        collection: String,
        stats: TraversalStats,
        elapsed: Duration,
    },
    Failed {
        collection: String,
        page: usize,
        error_kind: &'static str,
        message: String,
    },
}

/// Events emitted by the query cache
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Hit { key: String },
    Miss { key: String },
    Coalesced { key: String },
    StaleResultDiscarded { key: String, generation: u64 },
    Evicted { key: String },
    Invalidated { prefix: String, entries: usize },
}

/// Structured diagnostics collaborator
pub trait EventSink: Send + Sync {
    fn traversal(&self, event: &TraversalEvent);

    fn cache(&self, _event: &CacheEvent) {}
}

/// Sink that forwards every event to `tracing` with structured fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn shared() -> Arc<dyn EventSink> {
        Arc::new(TracingSink)
    }
}

impl EventSink for TracingSink {
    fn traversal(&self, event: &TraversalEvent) {
        match event {
            TraversalEvent::PageFetched {
                collection,
                page,
                items,
                rejected,
            } => {
                tracing::debug!(collection = %collection, page, items, rejected, "page fetched");
                if *rejected > 0 {
                    tracing::warn!(collection = %collection, page, rejected, "records rejected at ingestion");
                }
            }
            TraversalEvent::CursorStall {
                collection,
                page,
                cursor,
            } => {
                tracing::warn!(
                    collection = %collection,
                    page,
                    cursor = %cursor,
                    "cursor did not advance, stopping traversal"
                );
            }
            TraversalEvent::Truncated { collection, stats } => {
                tracing::warn!(
                    collection = %collection,
                    reason = %stats.stop_reason,
                    page_count = stats.page_count,
                    total_fetched = stats.total_fetched,
                    "traversal truncated, aggregates are a lower bound"
                );
            }
            TraversalEvent::Completed {
                collection,
                stats,
                elapsed,
            } => {
                tracing::info!(
                    collection = %collection,
                    reason = %stats.stop_reason,
                    truncated = stats.truncated,
                    page_count = stats.page_count,
                    total_fetched = stats.total_fetched,
                    unique_count = stats.unique_count,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "traversal finished"
                );
            }
            TraversalEvent::Failed {
                collection,
                page,
                error_kind,
                message,
            } => {
                tracing::warn!(
                    collection = %collection,
                    page,
                    error_kind,
                    error = %message,
                    "traversal failed"
                );
            }
        }
    }

    fn cache(&self, event: &CacheEvent) {
        match event {
            CacheEvent::Hit { key } => tracing::debug!(key = %key, "cache hit"),
            CacheEvent::Miss { key } => tracing::debug!(key = %key, "cache miss"),
            CacheEvent::Coalesced { key } => {
                tracing::debug!(key = %key, "joined in-flight traversal")
            }
            CacheEvent::StaleResultDiscarded { key, generation } => {
                tracing::debug!(key = %key, generation, "discarded superseded result")
            }
            CacheEvent::Evicted { key } => tracing::debug!(key = %key, "cache entry evicted"),
            CacheEvent::Invalidated { prefix, entries } => {
                tracing::info!(prefix = %prefix, entries, "cache invalidated")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_truncation() {
        assert!(!StopReason::Exhausted.is_truncation());
        assert!(StopReason::PageLimit.is_truncation());
        assert!(StopReason::ItemLimit.is_truncation());
        assert!(StopReason::CursorStall.is_truncation());
        assert!(StopReason::MalformedPage.is_truncation());
    }

    #[test]
    fn test_stats_serialize_snake_case() {
        let stats = TraversalStats {
            truncated: true,
            page_count: 2,
            total_fetched: 1000,
            unique_count: 998,
            rejected: 1,
            stop_reason: StopReason::PageLimit,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["stop_reason"], "page_limit");
        assert_eq!(json["total_fetched"], 1000);
    }

    #[test]
    fn test_tracing_sink_accepts_all_events() {
        let sink = TracingSink;
        sink.traversal(&TraversalEvent::CursorStall {
            collection: "/sales".into(),
            page: 3,
            cursor: CompositeCursor::new("2025-01-01", 4),
        });
        sink.cache(&CacheEvent::Invalidated {
            prefix: "sales".into(),
            entries: 2,
        });
    }
}
