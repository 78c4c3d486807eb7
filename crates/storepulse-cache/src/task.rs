//! Query task lifecycle
//!
//! A [`QueryTask`] is one consumer's request for a key: it subscribes to the
//! store, serves what the policy allows from cache, starts or joins a load
//! when needed and publishes [`QueryState`] snapshots on a watch channel.
//! Cancelling (or dropping) the [`TaskHandle`] stops publication; if it was
//! the last consumer of an in-flight load, that load is cancelled as well.

use crate::policy::{CachePolicy, Trigger};
use crate::store::QueryStore;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use storepulse_core::{Error, QueryKey, Result};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a consumer renders
#[derive(Debug)]
pub struct QueryState<V> {
    pub data: Option<Arc<V>>,
    /// `data` belongs to a previous key and is shown while loading
    pub is_placeholder: bool,
    /// Fetching with nothing to show yet
    pub is_loading: bool,
    pub is_fetching: bool,
    pub error: Option<Arc<Error>>,
    pub updated_at: Option<Instant>,
}

impl<V> Clone for QueryState<V> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            is_placeholder: self.is_placeholder,
            is_loading: self.is_loading,
            is_fetching: self.is_fetching,
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

impl<V> Default for QueryState<V> {
    fn default() -> Self {
        Self {
            data: None,
            is_placeholder: false,
            is_loading: false,
            is_fetching: false,
            error: None,
            updated_at: None,
        }
    }
}

/// Builder for one consumer's query
pub struct QueryTask<V> {
    store: QueryStore,
    key: QueryKey,
    policy: CachePolicy,
    trigger: Trigger,
    placeholder: Option<Arc<V>>,
}

impl<V: Any + Send + Sync> QueryTask<V> {
    pub fn new(store: QueryStore, key: QueryKey, policy: CachePolicy) -> Self {
        Self {
            store,
            key,
            policy,
            trigger: Trigger::Mount,
            placeholder: None,
        }
    }

    /// Start with default settings: mount trigger, no placeholder
    pub fn start<F, Fut>(store: QueryStore, key: QueryKey, policy: CachePolicy, loader: F) -> TaskHandle<V>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        Self::new(store, key, policy).spawn(loader)
    }

    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Previous result to show while loading, honoured only by policies
    /// with `keep_previous`
    pub fn placeholder(mut self, previous: Option<Arc<V>>) -> Self {
        self.placeholder = previous;
        self
    }

    pub fn spawn<F, Fut>(self, loader: F) -> TaskHandle<V>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let QueryTask {
            store,
            key,
            policy,
            trigger,
            placeholder,
        } = self;

        store.subscribe(&key, policy);
        let decision = store.decide(&key, &policy, trigger);
        let cached = store.get::<V>(&key);
        let fetching = decision.refetch || cached.is_none();

        let mut initial = QueryState {
            is_fetching: fetching,
            ..QueryState::default()
        };
        match cached {
            Some(value) => {
                initial.data = Some(value);
                initial.updated_at = store.info(&key).and_then(|info| info.fetched_at);
            }
            None if policy.keep_previous && placeholder.is_some() => {
                initial.data = placeholder;
                initial.is_placeholder = true;
            }
            None => initial.is_loading = fetching,
        }

        let (tx, rx) = watch::channel(initial);
        let cancel = CancellationToken::new();

        if fetching {
            let cancel = cancel.clone();
            let store = store.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(key = %key, "query task cancelled before result");
                        return;
                    }
                    outcome = store.fetch(&key, policy, loader) => outcome,
                };
                if cancel.is_cancelled() {
                    return;
                }

                tx.send_modify(move |state| {
                    state.is_fetching = false;
                    state.is_loading = false;
                    match outcome {
                        Ok(value) => {
                            state.data = Some(value);
                            state.is_placeholder = false;
                            state.error = None;
                            state.updated_at = Some(Instant::now());
                        }
                        Err(e) => state.error = Some(e),
                    }
                });
            });
        }

        TaskHandle {
            store,
            key,
            cancel,
            released: Arc::new(AtomicBool::new(false)),
            state: rx,
        }
    }
}

/// Consumer side of a running [`QueryTask`]
pub struct TaskHandle<V> {
    store: QueryStore,
    key: QueryKey,
    cancel: CancellationToken,
    released: Arc<AtomicBool>,
    state: watch::Receiver<QueryState<V>>,
}

impl<V: Send + Sync + 'static> TaskHandle<V> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Stop publishing and release this consumer's subscription
    pub fn cancel(&self) {
        self.cancel.cancel();
        if !self.released.swap(true, Ordering::SeqCst) {
            self.store.unsubscribe(&self.key);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Latest published state
    pub fn state(&self) -> QueryState<V> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every published state
    pub fn subscribe(&self) -> watch::Receiver<QueryState<V>> {
        self.state.clone()
    }

    /// Wait until the task stops fetching; returns the current state if it
    /// is cancelled first
    pub async fn settled(&self) -> QueryState<V> {
        let mut rx = self.state.clone();
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = rx.wait_for(|state| !state.is_fetching) => {}
        }
        self.state()
    }

    /// Run `callback` once with the settled state, unless the task is
    /// cancelled first
    pub fn on_result<F>(&self, callback: F)
    where
        F: FnOnce(&QueryState<V>) + Send + 'static,
    {
        let mut rx = self.state.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let settled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                settled = rx.wait_for(|state| !state.is_fetching) => settled.map(|state| state.clone()),
            };
            if let Ok(state) = settled {
                if !cancel.is_cancelled() {
                    callback(&state);
                }
            }
        });
    }
}

impl<V> Drop for TaskHandle<V> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if !self.released.swap(true, Ordering::SeqCst) {
            self.store.unsubscribe(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn key(name: &str) -> QueryKey {
        QueryKey::new("task").segment(name)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_load_publishes_result() {
        let store = QueryStore::new();
        let handle = QueryTask::start(store.clone(), key("a"), CachePolicy::LIVE_TABLE, |_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(7u32)
        });

        let initial = handle.state();
        assert!(initial.is_loading && initial.is_fetching);
        assert!(initial.data.is_none());

        let settled = handle.settled().await;
        assert_eq!(settled.data.as_deref(), Some(&7));
        assert!(!settled.is_loading && !settled.is_fetching);
        assert!(settled.updated_at.is_some());
        assert_eq!(*store.get::<u32>(&key("a")).unwrap(), 7);
        assert_eq!(store.info(&key("a")).unwrap().subscribers, 1);

        drop(handle);
        assert_eq!(store.info(&key("a")).unwrap().subscribers, 0);
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_loader() {
        let store = QueryStore::new();
        store.set(&key("branches"), vec!["north"], CachePolicy::CATALOG);
        let calls = Arc::new(AtomicUsize::new(0));

        let loader_calls = calls.clone();
        let handle = QueryTask::start(store, key("branches"), CachePolicy::CATALOG, move |_| async move {
            loader_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["south"])
        });

        let state = handle.state();
        assert!(!state.is_fetching);
        assert_eq!(*state.data.unwrap(), vec!["north"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_shown_while_loading() {
        let store = QueryStore::new();
        let previous = Arc::new(100.0f64);

        let handle = QueryTask::new(store, key("from=2025-02-01"), CachePolicy::KPI_SUMMARY)
            .trigger(Trigger::ParameterChange)
            .placeholder(Some(previous))
            .spawn(|_| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(250.0f64)
            });

        let initial = handle.state();
        assert!(initial.is_placeholder);
        assert!(!initial.is_loading);
        assert!(initial.is_fetching);
        assert_eq!(initial.data.as_deref(), Some(&100.0));

        let settled = handle.settled().await;
        assert!(!settled.is_placeholder);
        assert_eq!(settled.data.as_deref(), Some(&250.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_ignored_without_keep_previous() {
        let store = QueryStore::new();
        let handle = QueryTask::new(store, key("a"), CachePolicy::LIVE_TABLE)
            .placeholder(Some(Arc::new(1u8)))
            .spawn(|_| async { Ok(2u8) });

        let initial = handle.state();
        assert!(initial.data.is_none());
        assert!(initial.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_never_publishes() {
        let store = QueryStore::new();
        let load_cancelled = Arc::new(AtomicBool::new(false));
        let callbacks = Arc::new(AtomicUsize::new(0));

        let observed = load_cancelled.clone();
        let handle = QueryTask::start(store.clone(), key("a"), CachePolicy::KPI_SUMMARY, move |cancel| async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    observed.store(true, Ordering::SeqCst);
                    Err(Error::Cancelled)
                }
                _ = tokio::time::sleep(Duration::from_secs(5)) => Ok(1u8),
            }
        });
        let called = callbacks.clone();
        handle.on_result(move |_| {
            called.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let state = handle.state();
        assert!(state.data.is_none());
        assert!(state.is_fetching);
        assert_eq!(callbacks.load(Ordering::SeqCst), 0);
        assert!(load_cancelled.load(Ordering::SeqCst));
        assert!(store.get::<u8>(&key("a")).is_none());
        assert_eq!(store.info(&key("a")).unwrap().subscribers, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_published_and_cache_untouched() {
        let store = QueryStore::new();
        store.set(&key("a"), 1u8, CachePolicy::LIVE_TABLE);

        let handle = QueryTask::start(store.clone(), key("a"), CachePolicy::LIVE_TABLE, |_| async {
            Err::<u8, _>(Error::Http {
                status: 503,
                message: "unavailable".into(),
            })
        });
        let initial = handle.state();
        assert_eq!(initial.data.as_deref(), Some(&1));
        assert!(initial.is_fetching && !initial.is_loading);

        let settled = handle.settled().await;
        assert!(matches!(
            settled.error.as_deref(),
            Some(Error::Http { status: 503, .. })
        ));
        assert_eq!(settled.data.as_deref(), Some(&1));
        assert_eq!(*store.get::<u8>(&key("a")).unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_result_runs_once() {
        let store = QueryStore::new();
        let results = Arc::new(AtomicUsize::new(0));

        let handle = QueryTask::start(store, key("a"), CachePolicy::DASHBOARD, |_| async { Ok(3u8) });
        let seen = results.clone();
        handle.on_result(move |state| {
            assert_eq!(state.data.as_deref(), Some(&3));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        handle.settled().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(results.load(Ordering::SeqCst), 1);
    }
}
