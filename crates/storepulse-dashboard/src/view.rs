//! A view is a cache key, a freshness policy and the loader producing its value

use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::future::Future;
use storepulse_cache::{CachePolicy, FetchResult, QueryStore, QueryTask, TaskHandle, Trigger};
use storepulse_core::{QueryKey, Result};
use tokio_util::sync::CancellationToken;

type Loader<V> = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<V>> + Send>;

/// Everything needed to serve one view through a [`QueryStore`]
pub struct ViewQuery<V> {
    key: QueryKey,
    policy: CachePolicy,
    loader: Loader<V>,
}

impl<V: Any + Send + Sync> ViewQuery<V> {
    pub fn new<F, Fut>(key: QueryKey, policy: CachePolicy, loader: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        Self {
            key,
            policy,
            loader: Box::new(move |cancel| loader(cancel).boxed()),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Serve once, from cache when the policy allows
    pub async fn load(self, store: &QueryStore, trigger: Trigger) -> FetchResult<V> {
        store
            .load(&self.key, self.policy, trigger, self.loader)
            .await
    }

    /// Start a consumer task publishing [`storepulse_cache::QueryState`] updates.
    ///
    /// `previous` is shown while loading when the policy keeps previous data.
    pub fn watch(
        self,
        store: &QueryStore,
        trigger: Trigger,
        previous: Option<std::sync::Arc<V>>,
    ) -> TaskHandle<V> {
        QueryTask::new(store.clone(), self.key, self.policy)
            .trigger(trigger)
            .placeholder(previous)
            .spawn(self.loader)
    }
}
