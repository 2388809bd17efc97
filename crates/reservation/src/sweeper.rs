//! Periodic expiry sweep owned by the table's lifecycle

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use stocklock_inventory::InventoryProvider;

use crate::table::ReservationTable;

/// Handle to a running sweeper task. Dropping the handle leaves the task
/// running; call `shutdown` for a clean stop.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

impl<P: InventoryProvider + 'static> ReservationTable<P> {
    /// Start the background expiry sweep at the configured interval.
    ///
    /// The task runs until `SweeperHandle::shutdown` is called, so tests
    /// and multi-instance deployments stop it deterministically.
    pub fn start_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let table = Arc::clone(self);
        let interval = Duration::from_secs(self.config().sweep_interval_secs);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it so the sweep
            // cadence starts one interval after startup
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = table.sweep_expired();
                        if removed > 0 {
                            info!(removed, "expired reservations swept");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("reservation sweeper stopped");
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocklock_inventory::{InventoryQuery, InventoryQueryConfig, StaticInventory};
    use stocklock_ratelimit::{RateLimitConfig, RateLimiter};
    use stocklock_types::{Clock, ManualClock};

    use crate::table::ReservationConfig;

    fn table_with_clock(
        sweep_interval_secs: u64,
    ) -> (Arc<ReservationTable<StaticInventory>>, Arc<StaticInventory>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let provider = Arc::new(StaticInventory::new());
        let inventory = Arc::new(InventoryQuery::with_clock(
            provider.clone(),
            InventoryQueryConfig { cache_ttl_secs: 60 },
            clock.clone() as Arc<dyn Clock>,
        ));
        let limiter = Arc::new(RateLimiter::with_clock(
            RateLimitConfig::default(),
            clock.clone() as Arc<dyn Clock>,
        ));
        let table = Arc::new(ReservationTable::with_clock(
            inventory,
            limiter,
            ReservationConfig {
                sweep_interval_secs,
                ..ReservationConfig::default()
            },
            clock.clone() as Arc<dyn Clock>,
        ));
        (table, provider, clock)
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let (table, provider, clock) = table_with_clock(1);
        provider.set("item-1", 5);

        table.acquire("item-1", 2, "sess-a").await.unwrap();
        clock.advance_secs(601);

        let sweeper = table.start_sweeper();
        tokio::time::sleep(Duration::from_millis(1_300)).await;

        assert!(table.is_empty());
        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_shutdown_is_clean() {
        let (table, _provider, _clock) = table_with_clock(60);

        let sweeper = table.start_sweeper();
        // Shuts down well before the first tick would fire
        sweeper.shutdown().await;
    }
}
