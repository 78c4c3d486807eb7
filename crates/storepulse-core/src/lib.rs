//! StorePulse Core Types and Traits
//!
//! This crate provides the fundamental types shared by every StorePulse crate:
//! - Domain records returned by the collection endpoints
//! - Composite cursors, pages and logical collection queries
//! - The null-safe numeric coercion used by every KPI
//! - The collection source trait and traversal event sink
//! - Core error types

pub mod cursor;
pub mod error;
pub mod events;
pub mod numeric;
pub mod query;
pub mod record;
pub mod source;
pub mod types;

pub use cursor::{CompositeCursor, CursorKey, Page, PageRequest};
pub use error::{Error, Result};
pub use events::{CacheEvent, EventSink, StopReason, TracingSink, TraversalEvent, TraversalStats};
pub use numeric::{Numeric, to_number};
pub use query::{CollectionQuery, DimensionFilter, QueryKey};
pub use record::Record;
pub use source::CollectionSource;
