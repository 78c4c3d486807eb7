//! Cross-page deduplication and cursor stall detection

use std::collections::HashSet;
use storepulse_core::{CompositeCursor, Record};

/// Keep the first record seen for every natural key, preserving order.
///
/// Pages may repeat a record at their boundary when the ordering field is not
/// unique; running this again over its own output changes nothing.
pub fn dedup_by_key<R: Record>(records: Vec<R>) -> Vec<R> {
    let mut seen: HashSet<R::Key> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.natural_key()))
        .collect()
}

/// `true` when the server answered with the very cursor it was sent
pub fn is_stalled(requested_with: Option<&CompositeCursor>, next: Option<&CompositeCursor>) -> bool {
    matches!((requested_with, next), (Some(sent), Some(next)) if sent == next)
}

/// Tracks non-advancing cursors over the life of a traversal or feed
#[derive(Debug, Default, Clone)]
pub struct StallDetector {
    stalls: usize,
}

impl StallDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the cursor a page returned against the one used to request it
    pub fn observe(
        &mut self,
        requested_with: Option<&CompositeCursor>,
        next: Option<&CompositeCursor>,
    ) -> bool {
        let stalled = is_stalled(requested_with, next);
        if stalled {
            self.stalls += 1;
        }
        stalled
    }

    pub fn stalls(&self) -> usize {
        self.stalls
    }
}
