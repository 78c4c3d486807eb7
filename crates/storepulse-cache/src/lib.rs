//! StorePulse query cache
//!
//! An explicit keyed store of query results with per-consumer freshness
//! policies:
//! - [`policy`]: staleness/retention windows and refetch decisions
//! - [`store`]: the shared [`QueryStore`] with request coalescing,
//!   last-initiated-wins writes and prefix invalidation
//! - [`task`]: start/cancel/on-result lifecycle for UI consumers
//! - [`janitor`]: periodic retention eviction

pub mod janitor;
pub mod policy;
pub mod store;
pub mod task;

pub use janitor::{Janitor, spawn_janitor};
pub use policy::{CacheDecision, CachePolicy, RefetchOnMount, Trigger};
pub use store::{EntryInfo, FetchResult, QueryStore};
pub use task::{QueryState, QueryTask, TaskHandle};
