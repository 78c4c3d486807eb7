//! Background retention eviction

use crate::store::QueryStore;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Handle for the background janitor task
pub struct Janitor {
    shutdown_tx: tokio::sync::mpsc::Sender<()>,
}

impl Janitor {
    /// Signal the janitor to stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Spawn a task evicting expired entries every `interval`
pub fn spawn_janitor(store: QueryStore, interval: Duration) -> Janitor {
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "starting cache janitor");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("cache janitor shutting down");
                    break;
                }
                _ = sleep(interval) => {
                    let evicted = store.evict_expired(Instant::now());
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = store.len(), "cache janitor cycle");
                    }
                }
            }
        }
    });

    Janitor { shutdown_tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CachePolicy;
    use storepulse_core::QueryKey;

    #[tokio::test(start_paused = true)]
    async fn test_janitor_evicts_after_retention() {
        let store = QueryStore::new();
        let key = QueryKey::new("dashboard").segment("from=2025-01-01");
        store.set(&key, 1u8, CachePolicy::DASHBOARD);

        let janitor = spawn_janitor(store.clone(), Duration::from_secs(60));

        sleep(Duration::from_secs(9 * 60 + 30)).await;
        assert!(store.get::<u8>(&key).is_some());

        sleep(Duration::from_secs(2 * 60)).await;
        assert!(store.get::<u8>(&key).is_none());

        janitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_janitor_keeps_subscribed_entries() {
        let store = QueryStore::new();
        let key = QueryKey::new("catalog").segment("branches");
        store.set(&key, 1u8, CachePolicy::CATALOG);
        store.subscribe(&key, CachePolicy::CATALOG);

        let janitor = spawn_janitor(store.clone(), Duration::from_secs(60));
        sleep(Duration::from_secs(60 * 60)).await;
        assert!(store.get::<u8>(&key).is_some());
        janitor.shutdown().await;
    }
}
