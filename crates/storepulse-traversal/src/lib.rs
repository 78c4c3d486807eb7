//! StorePulse Traversal
//!
//! Cursor pagination over remote collections:
//! - [`driver`]: bounded, sequential fetch loop producing a deduplicated record set
//! - [`dedup`]: first-seen deduplication by natural key and cursor stall detection
//! - [`guard`]: page/item caps and truncation decisions
//! - [`feed`]: on-demand page loading for live table views

pub mod dedup;
pub mod driver;
pub mod feed;
pub mod guard;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use dedup::{dedup_by_key, is_stalled};
pub use driver::{Traversal, TraversalOutcome};
pub use feed::PageFeed;
pub use guard::{GuardDecision, TraversalLimits, TruncationGuard};
pub use tokio_util::sync::CancellationToken;
