//! Collection source trait definitions

use crate::{CollectionQuery, Page, PageRequest, Record, Result};
use std::sync::Arc;

/// A remote collection that serves records one cursor page at a time.
///
/// Implementations:
/// - `HttpCollection` (storepulse-egress): the dashboard REST API
/// - `ScriptedSource` (storepulse-traversal, `test-util`): in-memory pages for tests
///
/// Implementations perform their own bounded retry; an `Err` returned here is
/// final for the page and aborts the traversal.
#[async_trait::async_trait]
pub trait CollectionSource<R: Record>: Send + Sync {
    async fn fetch_page(&self, query: &CollectionQuery, request: &PageRequest) -> Result<Page<R>>;
}

#[async_trait::async_trait]
impl<R, S> CollectionSource<R> for Arc<S>
where
    R: Record,
    S: CollectionSource<R> + ?Sized,
{
    async fn fetch_page(&self, query: &CollectionQuery, request: &PageRequest) -> Result<Page<R>> {
        (**self).fetch_page(query, request).await
    }
}
