//! Composite cursors and pages
//!
//! Collections are ordered by a non-unique primary field (usually a date), so
//! every continuation token carries a secondary tie-breaker. A valid next
//! cursor always points strictly past the last record of the page it came
//! with; receiving the same cursor that was sent is a protocol fault.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tie-breaking half of a composite cursor
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CursorKey {
    /// Monotonically increasing record id
    Int(i64),
    /// Text tie-breaker for collections keyed by two text fields (sku, warehouse)
    Text(String),
}

impl fmt::Display for CursorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorKey::Int(id) => write!(f, "{}", id),
            CursorKey::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CursorKey {
    fn from(value: i64) -> Self {
        CursorKey::Int(value)
    }
}

impl From<&str> for CursorKey {
    fn from(value: &str) -> Self {
        CursorKey::Text(value.to_string())
    }
}

/// Continuation token made of two ordering fields
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositeCursor {
    pub primary: String,
    pub secondary: CursorKey,
}

impl CompositeCursor {
    pub fn new(primary: impl Into<String>, secondary: impl Into<CursorKey>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

impl fmt::Display for CompositeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.primary, self.secondary)
    }
}

/// One request in a traversal
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Page size requested from the server
    pub limit: usize,
    /// `None` for the first page
    pub cursor: Option<CompositeCursor>,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self {
            limit,
            cursor: None,
        }
    }

    pub fn after(limit: usize, cursor: CompositeCursor) -> Self {
        Self {
            limit,
            cursor: Some(cursor),
        }
    }
}

/// One page of validated records
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub items: Vec<R>,
    /// `None` signals that the collection is exhausted
    pub next_cursor: Option<CompositeCursor>,
    /// Items dropped at ingestion because they failed validation
    pub rejected: usize,
}

impl<R> Page<R> {
    pub fn new(items: Vec<R>, next_cursor: Option<CompositeCursor>) -> Self {
        Self {
            items,
            next_cursor,
            rejected: 0,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}
