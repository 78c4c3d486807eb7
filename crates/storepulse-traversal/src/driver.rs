//! Cursor pagination driver
//!
//! Issues page requests strictly one after another, feeding each page's next
//! cursor into the following request until the collection is exhausted or a
//! bound trips. Records are accumulated as they arrive and deduplicated once
//! at the end, so the unique result does not depend on the page size.

use crate::dedup::{StallDetector, dedup_by_key};
use crate::guard::{GuardDecision, TraversalLimits, TruncationGuard};
use std::sync::Arc;
use std::time::Instant;
use storepulse_core::{
    CollectionQuery, CollectionSource, CompositeCursor, Error, EventSink, PageRequest, Record,
    Result, StopReason, TracingSink, TraversalEvent, TraversalStats,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Deduplicated records plus how complete they are
#[derive(Debug, Clone)]
pub struct TraversalOutcome<R> {
    pub records: Vec<R>,
    pub stats: TraversalStats,
}

/// Bounded traversal of one collection
pub struct Traversal<R: Record> {
    source: Arc<dyn CollectionSource<R>>,
    limits: TraversalLimits,
    sink: Arc<dyn EventSink>,
}

impl<R: Record> Clone for Traversal<R> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            limits: self.limits,
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<R: Record> Traversal<R> {
    pub fn new(source: Arc<dyn CollectionSource<R>>, limits: TraversalLimits) -> Self {
        Self {
            source,
            limits,
            sink: TracingSink::shared(),
        }
    }

    /// Route traversal events to `sink` instead of plain tracing
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn limits(&self) -> TraversalLimits {
        self.limits
    }

    /// Run the fetch loop for `query`.
    ///
    /// Hard page failures abort the traversal and discard what was
    /// accumulated. A malformed page or a non-advancing cursor stops the loop
    /// and returns what was collected so far, marked as truncated. `cancel`
    /// is checked before every request and interrupts an in-flight one.
    #[instrument(skip(self, query, cancel), fields(collection = %query.collection, page_size = self.limits.page_size))]
    pub async fn run(
        &self,
        query: &CollectionQuery,
        cancel: &CancellationToken,
    ) -> Result<TraversalOutcome<R>> {
        self.limits.validate()?;

        let started = Instant::now();
        let collection = query.collection.as_str();
        let mut guard = TruncationGuard::new(self.limits);
        let mut stalls = StallDetector::new();
        let mut accumulated: Vec<R> = Vec::new();
        let mut rejected = 0usize;
        let mut cursor: Option<CompositeCursor> = None;

        let stop_reason = loop {
            if cancel.is_cancelled() {
                debug!(pages = guard.pages(), "traversal cancelled");
                return Err(Error::Cancelled);
            }

            let page_no = guard.pages() + 1;
            let request = PageRequest {
                limit: self.limits.page_size,
                cursor: cursor.take(),
            };

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(page = page_no, "traversal cancelled mid-request");
                    return Err(Error::Cancelled);
                }
                result = self.source.fetch_page(query, &request) => result,
            };

            let page = match fetched {
                Ok(page) => page,
                Err(e) => {
                    self.sink.traversal(&TraversalEvent::Failed {
                        collection: collection.to_string(),
                        page: page_no,
                        error_kind: e.kind(),
                        message: e.to_string(),
                    });
                    if e.is_soft() {
                        break StopReason::MalformedPage;
                    }
                    return Err(e);
                }
            };

            guard.record_page(page.items.len());
            rejected += page.rejected;
            self.sink.traversal(&TraversalEvent::PageFetched {
                collection: collection.to_string(),
                page: page_no,
                items: page.items.len(),
                rejected: page.rejected,
            });
            accumulated.extend(page.items);

            if stalls.observe(request.cursor.as_ref(), page.next_cursor.as_ref()) {
                if let Some(sent) = request.cursor {
                    self.sink.traversal(&TraversalEvent::CursorStall {
                        collection: collection.to_string(),
                        page: page_no,
                        cursor: sent,
                    });
                }
                break StopReason::CursorStall;
            }

            match guard.check(page.next_cursor.is_some()) {
                GuardDecision::Continue => cursor = page.next_cursor,
                GuardDecision::Stop(reason) => break reason,
            }
        };

        let total_fetched = accumulated.len();
        let records = dedup_by_key(accumulated);
        let stats = TraversalStats {
            truncated: stop_reason.is_truncation(),
            page_count: guard.pages(),
            total_fetched,
            unique_count: records.len(),
            rejected,
            stop_reason,
        };

        if stats.truncated {
            self.sink.traversal(&TraversalEvent::Truncated {
                collection: collection.to_string(),
                stats,
            });
        }
        self.sink.traversal(&TraversalEvent::Completed {
            collection: collection.to_string(),
            stats,
            elapsed: started.elapsed(),
        });

        Ok(TraversalOutcome { records, stats })
    }
}
