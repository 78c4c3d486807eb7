//! On-demand page loading for live tables
//!
//! A [`PageFeed`] holds the cursor between calls so a table can load one more
//! page when the user scrolls. Records already shown are never appended
//! twice. Changing filters means starting a new feed.

use crate::dedup::StallDetector;
use std::collections::HashSet;
use std::sync::Arc;
use storepulse_core::{
    CollectionQuery, CollectionSource, CompositeCursor, PageRequest, Record, Result,
};
use tracing::{debug, warn};

pub struct PageFeed<R: Record> {
    source: Arc<dyn CollectionSource<R>>,
    query: CollectionQuery,
    page_size: usize,
    cursor: Option<CompositeCursor>,
    seen: HashSet<R::Key>,
    items: Vec<R>,
    pages: usize,
    exhausted: bool,
    truncated: bool,
    stalls: StallDetector,
}

impl<R: Record> PageFeed<R> {
    pub fn new(source: Arc<dyn CollectionSource<R>>, query: CollectionQuery, page_size: usize) -> Self {
        Self {
            source,
            query,
            page_size: page_size.max(1),
            cursor: None,
            seen: HashSet::new(),
            items: Vec::new(),
            pages: 0,
            exhausted: false,
            truncated: false,
            stalls: StallDetector::new(),
        }
    }

    /// Fetch the next page and append its unseen records.
    ///
    /// Returns how many records were appended. A failed request leaves the
    /// feed unchanged so the caller may try again; a malformed page or a
    /// stalled cursor ends the feed.
    pub async fn next_page(&mut self) -> Result<usize> {
        if self.exhausted {
            return Ok(0);
        }

        let request = PageRequest {
            limit: self.page_size,
            cursor: self.cursor.clone(),
        };
        let page = match self.source.fetch_page(&self.query, &request).await {
            Ok(page) => page,
            Err(e) if e.is_soft() => {
                warn!(collection = %self.query.collection, error = %e, "feed stopped on malformed page");
                self.exhausted = true;
                self.truncated = true;
                return Ok(0);
            }
            Err(e) => return Err(e),
        };
        self.pages += 1;

        let before = self.items.len();
        for record in page.items {
            if self.seen.insert(record.natural_key()) {
                self.items.push(record);
            }
        }
        let appended = self.items.len() - before;

        if self.stalls.observe(request.cursor.as_ref(), page.next_cursor.as_ref()) {
            warn!(collection = %self.query.collection, page = self.pages, "feed cursor did not advance");
            self.exhausted = true;
            self.truncated = true;
        } else {
            self.exhausted = page.next_cursor.is_none();
            self.cursor = page.next_cursor;
        }

        debug!(
            collection = %self.query.collection,
            page = self.pages,
            appended,
            has_more = !self.exhausted,
            "feed page loaded"
        );
        Ok(appended)
    }

    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    /// `true` when the feed ended before the server reported exhaustion
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages
    }

    pub fn query(&self) -> &CollectionQuery {
        &self.query
    }

    pub fn into_items(self) -> Vec<R> {
        self.items
    }
}
