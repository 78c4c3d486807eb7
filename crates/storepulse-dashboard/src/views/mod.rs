//! Per-view logical queries
//!
//! Each view pairs a cache scope, a freshness policy and traversal limits
//! with a loader that traverses its collection and aggregates the result.
//! `*_query` builds the [`crate::ViewQuery`] for callers that want a
//! consumer task; the plain method serves it once through the store.

pub mod catalog;
pub mod inventory;
pub mod overview;
pub mod sales;

#[cfg(test)]
pub(crate) mod test_support;
