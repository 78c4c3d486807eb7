//! In-memory collection sources and an event recorder for tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use storepulse_core::{
    CacheEvent, CollectionQuery, CollectionSource, CompositeCursor, EventSink, Page, PageRequest,
    Record, Result, TraversalEvent,
};

/// Source replaying a fixed script of page responses in order.
///
/// Once the script is exhausted it answers with an empty last page.
pub struct ScriptedSource<R> {
    script: Mutex<VecDeque<Result<Page<R>>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl<R> ScriptedSource<R> {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page(self, items: Vec<R>, next_cursor: Option<CompositeCursor>) -> Self {
        self.with_response(Ok(Page::new(items, next_cursor)))
    }

    pub fn with_response(self, response: Result<Page<R>>) -> Self {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(response);
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }
}

impl<R> Default for ScriptedSource<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> CollectionSource<R> for ScriptedSource<R> {
    async fn fetch_page(&self, _query: &CollectionQuery, request: &PageRequest) -> Result<Page<R>> {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(request.clone());
        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(Page::new(Vec::new(), None)))
    }
}

/// Source serving an ordered dataset with real cursor semantics.
///
/// The cursor of a page is derived from its last record, so results are the
/// same whatever page size the caller uses.
pub struct MemoryCollection<R> {
    records: Vec<R>,
    cursor_of: fn(&R) -> CompositeCursor,
    delay: Option<Duration>,
    served: AtomicUsize,
}

impl<R: Record> MemoryCollection<R> {
    pub fn new(records: Vec<R>, cursor_of: fn(&R) -> CompositeCursor) -> Self {
        Self {
            records,
            cursor_of,
            delay: None,
            served: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering each page
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of pages answered
    pub fn pages_served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Record> CollectionSource<R> for MemoryCollection<R> {
    async fn fetch_page(&self, _query: &CollectionQuery, request: &PageRequest) -> Result<Page<R>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.served.fetch_add(1, Ordering::SeqCst);

        let start = match request.cursor {
            None => 0,
            Some(ref cursor) => self
                .records
                .iter()
                .position(|r| (self.cursor_of)(r) == *cursor)
                .map(|idx| idx + 1)
                .unwrap_or(self.records.len()),
        };
        let end = (start + request.limit).min(self.records.len());
        let items = self.records[start..end].to_vec();
        let next_cursor = if end < self.records.len() {
            items.last().map(self.cursor_of)
        } else {
            None
        };
        Ok(Page::new(items, next_cursor))
    }
}

/// Sink keeping every event for later assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    traversal: Mutex<Vec<TraversalEvent>>,
    cache: Mutex<Vec<CacheEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn traversal_events(&self) -> Vec<TraversalEvent> {
        self.traversal.lock().expect("sink lock poisoned").clone()
    }

    pub fn cache_events(&self) -> Vec<CacheEvent> {
        self.cache.lock().expect("sink lock poisoned").clone()
    }
}

impl EventSink for RecordingSink {
    fn traversal(&self, event: &TraversalEvent) {
        self.traversal
            .lock()
            .expect("sink lock poisoned")
            .push(event.clone());
    }

    fn cache(&self, event: &CacheEvent) {
        self.cache
            .lock()
            .expect("sink lock poisoned")
            .push(event.clone());
    }
}
