use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast;
use tracing::debug;

use stocklock_types::{Clock, SystemClock};

use crate::provider::{InventoryError, InventoryProvider};

#[derive(Debug, Clone)]
pub struct InventoryQueryConfig {
    /// How long a fetched quantity stays servable from cache
    pub cache_ttl_secs: u64,
}

impl Default for InventoryQueryConfig {
    fn default() -> Self {
        Self { cache_ttl_secs: 60 }
    }
}

struct CacheEntry {
    quantity: u32,
    fetched_at_ms: u64,
}

enum FetchRole {
    Leader(broadcast::Sender<Result<u32, InventoryError>>),
    Follower(broadcast::Receiver<Result<u32, InventoryError>>),
}

/// Facade over the remote on-hand quantity call.
///
/// Adds two things the reservation table relies on: concurrent requests
/// for the same item collapse into one provider call (all callers await
/// the same result), and results are cached for a short TTL. The table
/// invalidates the cache for an item whenever a lock is acquired,
/// released, or swept, so freed capacity shows up before the TTL runs out.
pub struct InventoryQuery<P: InventoryProvider> {
    provider: Arc<P>,
    config: InventoryQueryConfig,
    cache: RwLock<HashMap<String, CacheEntry>>,
    inflight: Mutex<HashMap<String, broadcast::Sender<Result<u32, InventoryError>>>>,
    clock: Arc<dyn Clock>,
}

impl<P: InventoryProvider> InventoryQuery<P> {
    pub fn new(provider: Arc<P>, config: InventoryQueryConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        provider: Arc<P>,
        config: InventoryQueryConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            config,
            cache: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Current on-hand quantity for an item, served from cache when fresh
    pub async fn on_hand(&self, item_id: &str) -> Result<u32, InventoryError> {
        if let Some(quantity) = self.cached(item_id) {
            debug!(item_id, quantity, "inventory cache hit");
            return Ok(quantity);
        }

        let role = {
            let mut inflight = self.inflight.lock().unwrap();
            match inflight.get(item_id) {
                Some(tx) => FetchRole::Follower(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    inflight.insert(item_id.to_string(), tx.clone());
                    FetchRole::Leader(tx)
                }
            }
        };

        match role {
            FetchRole::Leader(tx) => {
                let result = self.provider.fetch_on_hand(item_id).await;
                if let Ok(quantity) = result {
                    self.store(item_id, quantity);
                }
                self.inflight.lock().unwrap().remove(item_id);
                let _ = tx.send(result.clone());
                result
            }
            FetchRole::Follower(mut rx) => {
                debug!(item_id, "inventory query deduplicated");
                match rx.recv().await {
                    Ok(result) => result,
                    // Leader dropped without broadcasting; fetch directly
                    Err(_) => {
                        let result = self.provider.fetch_on_hand(item_id).await;
                        if let Ok(quantity) = result {
                            self.store(item_id, quantity);
                        }
                        result
                    }
                }
            }
        }
    }

    /// Drop the cached quantity for an item so the next query goes
    /// upstream. Called by the reservation table on acquire, release,
    /// and sweep.
    pub fn invalidate(&self, item_id: &str) {
        if self.cache.write().unwrap().remove(item_id).is_some() {
            debug!(item_id, "inventory cache invalidated");
        }
    }

    fn cached(&self, item_id: &str) -> Option<u32> {
        let now_ms = self.clock.now_ms();
        let ttl_ms = self.config.cache_ttl_secs * 1000;
        let cache = self.cache.read().unwrap();
        cache
            .get(item_id)
            .filter(|entry| now_ms.saturating_sub(entry.fetched_at_ms) < ttl_ms)
            .map(|entry| entry.quantity)
    }

    fn store(&self, item_id: &str, quantity: u32) {
        self.cache.write().unwrap().insert(
            item_id.to_string(),
            CacheEntry {
                quantity,
                fetched_at_ms: self.clock.now_ms(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticInventory;
    use async_trait::async_trait;
    use std::time::Duration;
    use stocklock_types::ManualClock;

    fn facade(
        provider: Arc<StaticInventory>,
    ) -> (InventoryQuery<StaticInventory>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (
            InventoryQuery::with_clock(
                provider,
                InventoryQueryConfig { cache_ttl_secs: 60 },
                clock.clone() as Arc<dyn Clock>,
            ),
            clock,
        )
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_queries() {
        let provider = Arc::new(StaticInventory::new());
        provider.set("item-1", 5);
        let (query, _clock) = facade(provider.clone());

        assert_eq!(query.on_hand("item-1").await.unwrap(), 5);
        assert_eq!(query.on_hand("item-1").await.unwrap(), 5);
        assert_eq!(provider.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_expires_after_ttl() {
        let provider = Arc::new(StaticInventory::new());
        provider.set("item-1", 5);
        let (query, clock) = facade(provider.clone());

        assert_eq!(query.on_hand("item-1").await.unwrap(), 5);
        provider.set("item-1", 3);

        clock.advance_secs(59);
        assert_eq!(query.on_hand("item-1").await.unwrap(), 5);

        clock.advance_secs(2);
        assert_eq!(query.on_hand("item-1").await.unwrap(), 3);
        assert_eq!(provider.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let provider = Arc::new(StaticInventory::new());
        provider.set("item-1", 5);
        let (query, _clock) = facade(provider.clone());

        assert_eq!(query.on_hand("item-1").await.unwrap(), 5);
        provider.set("item-1", 2);
        query.invalidate("item-1");

        assert_eq!(query.on_hand("item-1").await.unwrap(), 2);
        assert_eq!(provider.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let provider = Arc::new(StaticInventory::new());
        provider.set("item-1", 5);
        provider.set_should_fail(true);
        let (query, _clock) = facade(provider.clone());

        assert!(query.on_hand("item-1").await.is_err());

        provider.set_should_fail(false);
        assert_eq!(query.on_hand("item-1").await.unwrap(), 5);
    }

    /// Provider that holds every fetch until released, to pin concurrent
    /// callers inside the dedup window.
    struct SlowInventory {
        inner: StaticInventory,
    }

    #[async_trait]
    impl InventoryProvider for SlowInventory {
        async fn fetch_on_hand(&self, item_id: &str) -> Result<u32, InventoryError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.inner.fetch_on_hand(item_id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_queries_share_one_fetch() {
        let slow = Arc::new(SlowInventory {
            inner: StaticInventory::new(),
        });
        slow.inner.set("item-1", 9);

        let query = Arc::new(InventoryQuery::new(
            slow.clone(),
            InventoryQueryConfig { cache_ttl_secs: 60 },
        ));

        let mut handles = vec![];
        for _ in 0..8 {
            let query = query.clone();
            handles.push(tokio::spawn(
                async move { query.on_hand("item-1").await },
            ));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 9);
        }
        assert_eq!(slow.inner.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_queries_share_one_failure() {
        let slow = Arc::new(SlowInventory {
            inner: StaticInventory::new(),
        });
        slow.inner.set_should_fail(true);

        let query = Arc::new(InventoryQuery::new(
            slow.clone(),
            InventoryQueryConfig { cache_ttl_secs: 60 },
        ));

        let mut handles = vec![];
        for _ in 0..4 {
            let query = query.clone();
            handles.push(tokio::spawn(
                async move { query.on_hand("item-1").await },
            ));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }
        assert_eq!(slow.inner.fetch_count(), 1);
    }
}
