//! Record trait shared by every collection

use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::hash::Hash;

/// A domain entity returned by a collection endpoint.
///
/// Records are read-only once fetched. Each type names the collection it is
/// served from and its natural unique key, which the traversal uses to drop
/// records repeated across page boundaries.
pub trait Record: DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Natural unique key, single field or compound
    type Key: Eq + Hash + Clone + Debug + Send + Sync;

    /// Collection path relative to the API base
    const COLLECTION: &'static str;

    fn natural_key(&self) -> Self::Key;

    /// Ingestion-time check run after deserialization.
    ///
    /// Records failing validation are rejected at the page boundary instead of
    /// reaching deduplication and aggregation.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}
