//! Keyed query result store
//!
//! Every [`QueryKey`] owns an independent slot; there is no cross-key
//! locking. Concurrent requests for one key share a single in-flight load.
//! Loads are numbered by a store-wide generation and a result is written only
//! when its generation is newer than the slot's current value and not older
//! than the slot's last invalidation, so the most recently initiated load
//! that resolves wins.

use crate::policy::{CacheDecision, CachePolicy, Trigger};
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use storepulse_core::{CacheEvent, Error, EventSink, QueryKey, Result, TracingSink};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Outcome handed to every consumer of a load
pub type FetchResult<V> = std::result::Result<Arc<V>, Arc<Error>>;

type AnyValue = Arc<dyn Any + Send + Sync>;
type SharedLoad = Shared<BoxFuture<'static, std::result::Result<AnyValue, Arc<Error>>>>;

struct InFlight {
    generation: u64,
    load: SharedLoad,
    cancel: CancellationToken,
    consumers: usize,
}

struct Entry {
    value: Option<AnyValue>,
    fetched_at: Option<Instant>,
    /// Generation of the load that wrote `value`
    generation: u64,
    /// Loads started before the last invalidation are never written
    floor: u64,
    invalidated: bool,
    policy: CachePolicy,
    subscribers: usize,
    unreferenced_since: Option<Instant>,
    in_flight: Option<InFlight>,
}

impl Entry {
    fn new(policy: CachePolicy, now: Instant) -> Self {
        Self {
            value: None,
            fetched_at: None,
            generation: 0,
            floor: 0,
            invalidated: false,
            policy,
            subscribers: 0,
            unreferenced_since: Some(now),
            in_flight: None,
        }
    }

    fn age(&self, now: Instant) -> Option<std::time::Duration> {
        self.value
            .as_ref()
            .and(self.fetched_at)
            .map(|at| now.saturating_duration_since(at))
    }

    fn expired(&self, now: Instant) -> bool {
        self.subscribers == 0
            && self.in_flight.is_none()
            && self
                .unreferenced_since
                .is_some_and(|since| now.saturating_duration_since(since) >= self.policy.retention_time)
    }
}

/// Snapshot of one slot, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub has_value: bool,
    pub fetched_at: Option<Instant>,
    pub generation: u64,
    pub invalidated: bool,
    pub subscribers: usize,
    pub in_flight: bool,
}

struct Inner {
    entries: DashMap<QueryKey, Entry>,
    generations: AtomicU64,
    sink: Arc<dyn EventSink>,
}

/// Shared handle to the query cache
#[derive(Clone)]
pub struct QueryStore {
    inner: Arc<Inner>,
}

impl Default for QueryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStore")
            .field("entries", &self.inner.entries.len())
            .finish()
    }
}

impl QueryStore {
    pub fn new() -> Self {
        Self::with_sink(TracingSink::shared())
    }

    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                generations: AtomicU64::new(1),
                sink,
            }),
        }
    }

    fn next_generation(&self) -> u64 {
        self.inner.generations.fetch_add(1, Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Cached value for `key`, if present and of type `V`
    pub fn get<V: Any + Send + Sync>(&self, key: &QueryKey) -> Option<Arc<V>> {
        let value = self.inner.entries.get(key)?.value.clone()?;
        value.downcast::<V>().ok()
    }

    /// Write a value directly; it supersedes every load started before
    pub fn set<V: Any + Send + Sync>(&self, key: &QueryKey, value: V, policy: CachePolicy) {
        let generation = self.next_generation();
        let now = Instant::now();
        let mut entry = self
            .inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(policy, now));
        entry.value = Some(Arc::new(value));
        entry.fetched_at = Some(now);
        entry.generation = generation;
        entry.invalidated = false;
        entry.policy = policy;
        if entry.subscribers == 0 {
            entry.unreferenced_since = Some(now);
        }
    }

    pub fn info(&self, key: &QueryKey) -> Option<EntryInfo> {
        self.inner.entries.get(key).map(|entry| EntryInfo {
            has_value: entry.value.is_some(),
            fetched_at: entry.fetched_at,
            generation: entry.generation,
            invalidated: entry.invalidated,
            subscribers: entry.subscribers,
            in_flight: entry.in_flight.is_some(),
        })
    }

    /// How a request for `key` under `policy` should be served
    pub fn decide(&self, key: &QueryKey, policy: &CachePolicy, trigger: Trigger) -> CacheDecision {
        let now = Instant::now();
        match self.inner.entries.get(key) {
            Some(entry) => policy.decide(entry.age(now), entry.invalidated, trigger),
            None => policy.decide(None, false, trigger),
        }
    }

    /// Mark every entry under `prefix` stale and detach their in-flight loads.
    ///
    /// Detached loads still resolve for the consumers already waiting on them,
    /// but their results are never written. Returns the number of entries
    /// touched.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let floor = self.inner.generations.load(Ordering::SeqCst);
        let mut touched = 0;
        for mut entry in self.inner.entries.iter_mut() {
            if !entry.key().starts_with(prefix) {
                continue;
            }
            entry.invalidated = true;
            entry.floor = floor;
            entry.in_flight = None;
            touched += 1;
        }

        self.inner.sink.cache(&CacheEvent::Invalidated {
            prefix: prefix.to_string(),
            entries: touched,
        });
        touched
    }

    /// Register an active consumer; subscribed entries are never evicted
    pub fn subscribe(&self, key: &QueryKey, policy: CachePolicy) {
        let now = Instant::now();
        let mut entry = self
            .inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(policy, now));
        entry.subscribers += 1;
        entry.unreferenced_since = None;
    }

    /// Drop an active consumer; retention starts when the last one leaves
    pub fn unsubscribe(&self, key: &QueryKey) {
        if let Some(mut entry) = self.inner.entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.unreferenced_since = Some(Instant::now());
            }
        }
    }

    /// Remove entries unreferenced for longer than their retention window
    pub fn evict_expired(&self, now: Instant) -> usize {
        let mut evicted = Vec::new();
        self.inner.entries.retain(|key, entry| {
            let expired = entry.expired(now);
            if expired {
                evicted.push(key.clone());
            }
            !expired
        });

        for key in &evicted {
            self.inner.sink.cache(&CacheEvent::Evicted {
                key: key.to_string(),
            });
        }
        evicted.len()
    }

    /// Serve `key` according to `policy`, loading only when the policy asks
    /// for a refetch or nothing usable is cached.
    pub async fn load<V, F, Fut>(
        &self,
        key: &QueryKey,
        policy: CachePolicy,
        trigger: Trigger,
        loader: F,
    ) -> FetchResult<V>
    where
        V: Any + Send + Sync,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let decision = self.decide(key, &policy, trigger);
        if !decision.refetch {
            if let Some(value) = self.get::<V>(key) {
                self.inner.sink.cache(&CacheEvent::Hit {
                    key: key.to_string(),
                });
                return Ok(value);
            }
        }

        self.inner.sink.cache(&CacheEvent::Miss {
            key: key.to_string(),
        });
        self.fetch(key, policy, loader).await
    }

    /// Load `key`, joining a load already in flight for it.
    ///
    /// Failures are returned to every joined consumer and never cached. When
    /// the last consumer of a load goes away before it resolves, the load's
    /// cancellation token fires and its result is discarded.
    pub async fn fetch<V, F, Fut>(&self, key: &QueryKey, policy: CachePolicy, loader: F) -> FetchResult<V>
    where
        V: Any + Send + Sync,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (load, generation) = self.join_or_start(key, policy, loader, false);
        self.consume(key, load, generation).await
    }

    /// Start a new load for `key` even if one is in flight.
    ///
    /// The earlier load keeps running for its consumers; whichever of the two
    /// was started last decides the cached value.
    pub async fn refetch<V, F, Fut>(&self, key: &QueryKey, policy: CachePolicy, loader: F) -> FetchResult<V>
    where
        V: Any + Send + Sync,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (load, generation) = self.join_or_start(key, policy, loader, true);
        self.consume(key, load, generation).await
    }

    async fn consume<V: Any + Send + Sync>(
        &self,
        key: &QueryKey,
        load: SharedLoad,
        generation: u64,
    ) -> FetchResult<V> {
        let _consumer = ConsumerGuard {
            store: self.clone(),
            key: key.clone(),
            generation,
        };
        let value = load.await?;
        value
            .downcast::<V>()
            .map_err(|_| Arc::new(Error::TypeMismatch(key.to_string())))
    }

    fn join_or_start<V, F, Fut>(
        &self,
        key: &QueryKey,
        policy: CachePolicy,
        loader: F,
        force: bool,
    ) -> (SharedLoad, u64)
    where
        V: Any + Send + Sync,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let now = Instant::now();
        let mut entry = self
            .inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(policy, now));

        if !force {
            let joined = entry.in_flight.as_mut().map(|flight| {
                flight.consumers += 1;
                (flight.load.clone(), flight.generation)
            });
            if let Some(joined) = joined {
                drop(entry);
                self.inner.sink.cache(&CacheEvent::Coalesced {
                    key: key.to_string(),
                });
                return joined;
            }
        }

        let generation = self.next_generation();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let store = self.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = loader(token.clone())
                .await
                .map(|value| Arc::new(value) as AnyValue);
            store.complete(&task_key, generation, &token, result, policy)
        });

        let load = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "query load task failed");
                    Err(Arc::new(Error::TaskFailed(e.to_string())))
                }
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            generation,
            load: load.clone(),
            cancel,
            consumers: 1,
        });
        debug!(key = %key, generation, "query load started");
        (load, generation)
    }

    /// Record a finished load, writing its value if it is still the winner
    fn complete(
        &self,
        key: &QueryKey,
        generation: u64,
        cancel: &CancellationToken,
        result: Result<AnyValue>,
        policy: CachePolicy,
    ) -> std::result::Result<AnyValue, Arc<Error>> {
        let mut discarded = false;
        match self.inner.entries.get_mut(key) {
            Some(mut entry) => {
                if entry
                    .in_flight
                    .as_ref()
                    .is_some_and(|flight| flight.generation == generation)
                {
                    entry.in_flight = None;
                }

                if let Ok(ref value) = result {
                    let winner = !cancel.is_cancelled()
                        && generation > entry.generation
                        && generation >= entry.floor;
                    if winner {
                        let now = Instant::now();
                        entry.value = Some(Arc::clone(value));
                        entry.fetched_at = Some(now);
                        entry.generation = generation;
                        entry.invalidated = false;
                        entry.policy = policy;
                        if entry.subscribers == 0 {
                            entry.unreferenced_since = Some(now);
                        }
                    } else {
                        discarded = true;
                    }
                }
            }
            None => discarded = result.is_ok(),
        }

        if discarded {
            self.inner.sink.cache(&CacheEvent::StaleResultDiscarded {
                key: key.to_string(),
                generation,
            });
        }
        result.map_err(Arc::new)
    }

    /// A consumer of `generation` went away
    fn release(&self, key: &QueryKey, generation: u64) {
        let Some(mut entry) = self.inner.entries.get_mut(key) else {
            return;
        };
        let abandoned = match entry.in_flight.as_mut() {
            Some(flight) if flight.generation == generation => {
                flight.consumers = flight.consumers.saturating_sub(1);
                flight.consumers == 0
            }
            _ => false,
        };
        if abandoned {
            if let Some(flight) = entry.in_flight.take() {
                flight.cancel.cancel();
                debug!(key = %key, generation, "last consumer left, load cancelled");
            }
        }
    }
}

struct ConsumerGuard {
    store: QueryStore,
    key: QueryKey,
    generation: u64,
}

impl Drop for ConsumerGuard {
    fn drop(&mut self) {
        self.store.release(&self.key, self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;
    use storepulse_core::CollectionQuery;
    use storepulse_traversal::testing::RecordingSink;

    fn key(name: &str) -> QueryKey {
        QueryKey::new("test").segment(name)
    }

    #[tokio::test]
    async fn test_set_and_typed_get() {
        let store = QueryStore::new();
        store.set(&key("a"), 42u32, CachePolicy::DASHBOARD);

        assert_eq!(store.get::<u32>(&key("a")).as_deref(), Some(&42));
        assert!(store.get::<String>(&key("a")).is_none());
        assert!(store.get::<u32>(&key("b")).is_none());
    }

    #[tokio::test]
    async fn test_keys_differing_by_inactive_flag_are_isolated() {
        let store = QueryStore::new();
        let base = CollectionQuery::new("/sales");
        let active_only = base.clone().include_inactive(false).cache_key("sales-kpis");
        let with_inactive = base.include_inactive(true).cache_key("sales-kpis");
        assert_ne!(active_only, with_inactive);

        store.set(&active_only, 300.0f64, CachePolicy::KPI_SUMMARY);
        store.set(&with_inactive, 800.0f64, CachePolicy::KPI_SUMMARY);
        store.set(&active_only, 310.0f64, CachePolicy::KPI_SUMMARY);

        assert_eq!(*store.get::<f64>(&active_only).unwrap(), 310.0);
        assert_eq!(*store.get::<f64>(&with_inactive).unwrap(), 800.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_are_coalesced() {
        let sink = Arc::new(RecordingSink::new());
        let store = QueryStore::with_sink(sink.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let loader = |calls: Arc<AtomicUsize>| {
            move |_cancel: CancellationToken| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, Error>(String::from("rows"))
            }
        };

        let key_a = key("a");
        let (a, b) = tokio::join!(
            store.fetch(&key_a, CachePolicy::DASHBOARD, loader(calls.clone())),
            store.fetch(&key_a, CachePolicy::DASHBOARD, loader(calls.clone())),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(
            sink.cache_events()
                .iter()
                .any(|e| matches!(e, CacheEvent::Coalesced { .. }))
        );
        assert!(!store.info(&key("a")).unwrap().in_flight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_load_resolving_late_does_not_overwrite() {
        let sink = Arc::new(RecordingSink::new());
        let store = QueryStore::with_sink(sink.clone());

        let key_a = key("a");
        let slow = store.fetch(&key_a, CachePolicy::KPI_SUMMARY, |_cancel| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, Error>("old")
        });
        let fast = async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            store
                .refetch(&key("a"), CachePolicy::KPI_SUMMARY, |_cancel| async {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<_, Error>("new")
                })
                .await
        };

        let (old, new) = tokio::join!(slow, fast);
        assert_eq!(*old.unwrap(), "old");
        assert_eq!(*new.unwrap(), "new");
        assert_eq!(*store.get::<&str>(&key("a")).unwrap(), "new");
        assert!(
            sink.cache_events()
                .iter()
                .any(|e| matches!(e, CacheEvent::StaleResultDiscarded { .. }))
        );
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let store = QueryStore::new();
        store.set(&key("a"), 1u8, CachePolicy::LIVE_TABLE);

        let result = store
            .refetch(&key("a"), CachePolicy::LIVE_TABLE, |_cancel| async {
                Err::<u8, _>(Error::Timeout(100))
            })
            .await;

        assert!(matches!(result, Err(ref e) if matches!(**e, Error::Timeout(100))));
        assert_eq!(*store.get::<u8>(&key("a")).unwrap(), 1);

        let missing = store
            .fetch(&key("b"), CachePolicy::LIVE_TABLE, |_cancel| async {
                Err::<u8, _>(Error::Unauthorized)
            })
            .await;
        assert!(missing.is_err());
        assert!(store.get::<u8>(&key("b")).is_none());
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix() {
        let store = QueryStore::new();
        let kpis_a = QueryKey::new("sales-kpis").segment("from=2025-01-01");
        let kpis_b = QueryKey::new("sales-kpis").segment("from=2025-02-01");
        let other = QueryKey::new("sales-kpis-extra").segment("from=2025-01-01");
        for k in [&kpis_a, &kpis_b, &other] {
            store.set(k, 1u8, CachePolicy::CATALOG);
        }

        assert_eq!(store.invalidate(&QueryKey::new("sales-kpis")), 2);
        assert!(store.info(&kpis_a).unwrap().invalidated);
        assert!(store.decide(&kpis_b, &CachePolicy::CATALOG, Trigger::Focus).refetch);
        assert!(!store.decide(&other, &CachePolicy::CATALOG, Trigger::Focus).refetch);
        // Stale data stays servable
        assert!(store.get::<u8>(&kpis_a).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_in_flight_load_is_not_written() {
        let store = QueryStore::new();
        let pending = tokio::spawn({
            let store = store.clone();
            async move {
                store
                    .fetch(&key("a"), CachePolicy::DASHBOARD, |_cancel| async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, Error>(5u32)
                    })
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.invalidate(&QueryKey::new("test"));

        assert_eq!(*pending.await.unwrap().unwrap(), 5);
        assert!(store.get::<u32>(&key("a")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_consumer_leaving_cancels_load() {
        let store = QueryStore::new();
        let observed = Arc::new(AtomicBool::new(false));

        let consumer = tokio::spawn({
            let store = store.clone();
            let observed = observed.clone();
            async move {
                store
                    .fetch(&key("a"), CachePolicy::DASHBOARD, move |cancel| async move {
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                observed.store(true, Ordering::SeqCst);
                                Err(Error::Cancelled)
                            }
                            _ = tokio::time::sleep(Duration::from_secs(60)) => Ok(1u8),
                        }
                    })
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.info(&key("a")).unwrap().in_flight);
        consumer.abort();
        let _ = consumer.await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(observed.load(Ordering::SeqCst));
        assert!(!store.info(&key("a")).unwrap().in_flight);
        assert!(store.get::<u8>(&key("a")).is_none());
    }

    #[tokio::test]
    async fn test_retention_respects_subscribers() {
        let sink = Arc::new(RecordingSink::new());
        let store = QueryStore::with_sink(sink.clone());
        let start = Instant::now();
        store.set(&key("idle"), 1u8, CachePolicy::DASHBOARD);
        store.set(&key("watched"), 2u8, CachePolicy::DASHBOARD);
        store.subscribe(&key("watched"), CachePolicy::DASHBOARD);

        assert_eq!(store.evict_expired(start + Duration::from_secs(9 * 60)), 0);
        assert_eq!(store.evict_expired(start + Duration::from_secs(11 * 60)), 1);
        assert!(store.info(&key("idle")).is_none());
        assert!(store.info(&key("watched")).is_some());

        store.unsubscribe(&key("watched"));
        let released = Instant::now();
        assert_eq!(store.evict_expired(released + Duration::from_secs(5 * 60)), 0);
        assert_eq!(store.evict_expired(released + Duration::from_secs(10 * 60)), 1);
        assert!(store.is_empty());
        assert_eq!(
            sink.cache_events()
                .iter()
                .filter(|e| matches!(e, CacheEvent::Evicted { .. }))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_load_serves_fresh_entries_from_cache() {
        let sink = Arc::new(RecordingSink::new());
        let store = QueryStore::with_sink(sink.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let value = store
                .load(&key("branches"), CachePolicy::CATALOG, Trigger::Mount, move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Error>(vec!["north", "south"])
                })
                .await
                .unwrap();
            assert_eq!(value.len(), 2);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.invalidate(&key("branches"));
        let calls_after = calls.clone();
        store
            .load(&key("branches"), CachePolicy::CATALOG, Trigger::Mount, move |_| async move {
                calls_after.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(vec!["north"])
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.get::<Vec<&str>>(&key("branches")).unwrap().len(), 1);

        let events = sink.cache_events();
        assert_eq!(events.iter().filter(|e| matches!(e, CacheEvent::Hit { .. })).count(), 1);
        assert_eq!(events.iter().filter(|e| matches!(e, CacheEvent::Miss { .. })).count(), 2);
    }
}
