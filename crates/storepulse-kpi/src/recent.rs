//! Recent-activity list

use crate::fact::Fact;
use std::cmp::Reverse;

/// The `k` most recent active records, newest first.
///
/// Records with equal timestamps are ordered by their tie-breaker, highest
/// first, so the list is the same for any input order.
pub fn recent_activity<F: Fact + Clone>(records: &[F], k: usize) -> Vec<F> {
    let mut active: Vec<&F> = records.iter().filter(|r| r.is_active()).collect();
    active.sort_by_key(|r| Reverse(r.recency()));
    active.into_iter().take(k).cloned().collect()
}
