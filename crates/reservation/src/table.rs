use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use stocklock_inventory::{InventoryProvider, InventoryQuery};
use stocklock_ratelimit::{RateLimitError, RateLimiter};
use stocklock_types::{
    mask_owner_id, AcquireOutcome, Clock, InvalidLockReason, LockEvent, LockValidation,
    Reservation, ReservationStatus, SystemClock,
};

use crate::error::ReservationError;

/// Endpoint key the table charges inventory reads against
pub const INVENTORY_ENDPOINT: &str = "inventory_query";

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ReservationConfig {
    /// Lifetime of an unconfirmed reservation in seconds
    pub ttl_secs: u64,

    /// Cadence of the background expiry sweep in seconds
    pub sweep_interval_secs: u64,

    /// When the upstream inventory query fails: `false` (default) fails
    /// the acquisition closed; `true` treats the item as available and
    /// logs a warning. Pick one per deployment.
    pub fail_open: bool,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600, // 10 minutes
            sweep_interval_secs: 60,
            fail_open: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TABLE
// ═══════════════════════════════════════════════════════════════════════════

type LockKey = (String, String);

/// In-memory reservation table keyed by `(item_id, owner_id)`.
///
/// Exclusively owns the reservation map; every transition goes through
/// the operations below. The acquire read-check-insert sequence runs
/// inside a per-item critical section so two sessions racing for the
/// last unit cannot both win.
pub struct ReservationTable<P: InventoryProvider> {
    config: ReservationConfig,
    locks: RwLock<HashMap<LockKey, Reservation>>,
    item_gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    inventory: Arc<InventoryQuery<P>>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<LockEvent>,
}

impl<P: InventoryProvider> ReservationTable<P> {
    pub fn new(
        inventory: Arc<InventoryQuery<P>>,
        limiter: Arc<RateLimiter>,
        config: ReservationConfig,
    ) -> Self {
        Self::with_clock(inventory, limiter, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        inventory: Arc<InventoryQuery<P>>,
        limiter: Arc<RateLimiter>,
        config: ReservationConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            config,
            locks: RwLock::new(HashMap::new()),
            item_gates: Mutex::new(HashMap::new()),
            inventory,
            limiter,
            clock,
            events,
        }
    }

    /// Subscribe to domain events (acquired, released, expired, ...)
    pub fn subscribe(&self) -> broadcast::Receiver<LockEvent> {
        self.events.subscribe()
    }

    /// Handle for publishing related domain events (used by the cart
    /// integration for cart-level events)
    pub fn event_sender(&self) -> broadcast::Sender<LockEvent> {
        self.events.clone()
    }

    pub fn config(&self) -> &ReservationConfig {
        &self.config
    }

    fn emit(&self, event: LockEvent) {
        let _ = self.events.send(event);
    }

    fn item_gate(&self, item_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.item_gates.lock().unwrap();
        gates
            .entry(item_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Sum of quantity across valid reservations for `item_id` held by
    /// owners other than `owner_id`
    fn locked_by_others(&self, item_id: &str, owner_id: &str, now: u64) -> u32 {
        let locks = self.locks.read().unwrap();
        locks
            .values()
            .filter(|r| r.item_id == item_id && r.owner_id != owner_id && r.is_active(now))
            .map(|r| r.quantity)
            .sum()
    }

    /// Acquire or extend a reservation for `(item_id, owner_id)`.
    ///
    /// A valid existing reservation is extended in place: its quantity is
    /// raised to `max(existing, requested)` and the TTL restarts. A fresh
    /// acquisition fetches the on-hand quantity (rate limited per owner),
    /// subtracts every other owner's valid holdings, and grants only if
    /// the remainder covers the request.
    pub async fn acquire(
        &self,
        item_id: &str,
        quantity: u32,
        owner_id: &str,
    ) -> Result<AcquireOutcome, ReservationError> {
        if quantity == 0 {
            return Err(ReservationError::ZeroQuantity);
        }

        let gate = self.item_gate(item_id);
        let _guard = gate.lock().await;

        let now = self.clock.now();
        let key: LockKey = (item_id.to_string(), owner_id.to_string());

        // Re-acquisition path: update the existing entry, never duplicate
        enum Existing {
            Extended(Reservation),
            Stale(Reservation),
            Absent,
        }

        let existing = {
            let mut locks = self.locks.write().unwrap();
            match locks.get(&key).map(|r| r.is_active(now)) {
                Some(true) => {
                    let entry = locks.get_mut(&key).unwrap();
                    entry.extend(quantity, now, self.config.ttl_secs);
                    Existing::Extended(entry.clone())
                }
                // Expired but unswept; clear it before the fresh attempt
                Some(false) => Existing::Stale(locks.remove(&key).unwrap()),
                None => Existing::Absent,
            }
        };

        match existing {
            Existing::Extended(snapshot) => {
                self.inventory.invalidate(item_id);
                debug!(
                    item_id,
                    owner = %mask_owner_id(owner_id),
                    quantity = snapshot.quantity,
                    "reservation extended"
                );
                self.emit(LockEvent::Extended {
                    item_id: item_id.to_string(),
                    owner: mask_owner_id(owner_id),
                    quantity: snapshot.quantity,
                    expires_at: snapshot.expires_at,
                });
                return Ok(AcquireOutcome::Granted {
                    reservation: snapshot,
                });
            }
            Existing::Stale(stale) => {
                self.emit(LockEvent::Expired {
                    item_id: stale.item_id,
                    owner: mask_owner_id(&stale.owner_id),
                    quantity: stale.quantity,
                });
            }
            Existing::Absent => {}
        }

        let on_hand = match self
            .limiter
            .with_rate_limit(owner_id, INVENTORY_ENDPOINT, self.inventory.on_hand(item_id))
            .await
        {
            Ok(on_hand) => Some(on_hand),
            Err(RateLimitError::LimitExceeded { retry_after_ms }) => {
                self.emit(LockEvent::RateLimited {
                    client: mask_owner_id(owner_id),
                    endpoint: INVENTORY_ENDPOINT.to_string(),
                    retry_after_ms,
                });
                return Err(ReservationError::RateLimited { retry_after_ms });
            }
            Err(RateLimitError::Operation(err)) if self.config.fail_open => {
                warn!(
                    item_id,
                    error = %err,
                    "inventory query failed, fail-open policy treats item as available"
                );
                None
            }
            Err(RateLimitError::Operation(err)) => {
                warn!(item_id, error = %err, "inventory query failed, acquisition fails closed");
                return Err(err.into());
            }
        };

        if let Some(on_hand) = on_hand {
            let other_locked = self.locked_by_others(item_id, owner_id, now);
            let available = on_hand.saturating_sub(other_locked);
            if available < quantity {
                debug!(
                    item_id,
                    owner = %mask_owner_id(owner_id),
                    requested = quantity,
                    available,
                    "acquisition rejected, insufficient inventory"
                );
                return Ok(AcquireOutcome::Insufficient {
                    requested: quantity,
                    available,
                });
            }
        }

        let reservation = Reservation::new(item_id, quantity, owner_id, now, self.config.ttl_secs);
        self.locks
            .write()
            .unwrap()
            .insert(key, reservation.clone());
        self.inventory.invalidate(item_id);

        info!(
            item_id,
            owner = %mask_owner_id(owner_id),
            quantity,
            expires_at = reservation.expires_at,
            "reservation acquired"
        );
        self.emit(LockEvent::Acquired {
            item_id: item_id.to_string(),
            owner: mask_owner_id(owner_id),
            quantity,
            expires_at: reservation.expires_at,
        });

        Ok(AcquireOutcome::Granted { reservation })
    }

    /// Check that a held lock still covers `required_quantity`
    pub fn validate(
        &self,
        item_id: &str,
        owner_id: &str,
        required_quantity: u32,
    ) -> LockValidation {
        let now = self.clock.now();
        let locks = self.locks.read().unwrap();
        let key: LockKey = (item_id.to_string(), owner_id.to_string());

        match locks.get(&key) {
            None => LockValidation::Invalid {
                reason: InvalidLockReason::NotFound,
            },
            Some(r) if r.is_expired(now) => LockValidation::Invalid {
                reason: InvalidLockReason::Expired,
            },
            Some(r) if r.quantity < required_quantity => LockValidation::Invalid {
                reason: InvalidLockReason::InsufficientQuantity {
                    held: r.quantity,
                    required: required_quantity,
                },
            },
            Some(r) => LockValidation::Valid {
                reservation: r.clone(),
            },
        }
    }

    /// Transition a valid pending reservation to confirmed. Returns
    /// `false` when there is nothing valid to confirm.
    pub fn confirm(&self, item_id: &str, owner_id: &str) -> bool {
        let now = self.clock.now();
        let key: LockKey = (item_id.to_string(), owner_id.to_string());

        let confirmed = {
            let mut locks = self.locks.write().unwrap();
            match locks.get_mut(&key) {
                Some(r) if r.status == ReservationStatus::Pending && !r.is_expired(now) => {
                    r.status = ReservationStatus::Confirmed;
                    true
                }
                _ => false,
            }
        };

        if confirmed {
            info!(item_id, owner = %mask_owner_id(owner_id), "reservation confirmed");
            self.emit(LockEvent::Confirmed {
                item_id: item_id.to_string(),
                owner: mask_owner_id(owner_id),
            });
        }
        confirmed
    }

    /// Remove the entry regardless of status. Idempotent: releasing a
    /// missing reservation returns `false`, never an error.
    pub fn release(&self, item_id: &str, owner_id: &str) -> bool {
        let key: LockKey = (item_id.to_string(), owner_id.to_string());
        let removed = self.locks.write().unwrap().remove(&key);

        match removed {
            Some(_) => {
                self.inventory.invalidate(item_id);
                info!(item_id, owner = %mask_owner_id(owner_id), "reservation released");
                self.emit(LockEvent::Released {
                    item_id: item_id.to_string(),
                    owner: mask_owner_id(owner_id),
                });
                true
            }
            None => false,
        }
    }

    /// Current reservation for the pair, if any
    pub fn lock_status(&self, item_id: &str, owner_id: &str) -> Option<Reservation> {
        let key: LockKey = (item_id.to_string(), owner_id.to_string());
        self.locks.read().unwrap().get(&key).cloned()
    }

    /// All reservations that still count against availability
    pub fn active_locks(&self) -> Vec<Reservation> {
        let now = self.clock.now();
        self.locks
            .read()
            .unwrap()
            .values()
            .filter(|r| r.is_active(now))
            .cloned()
            .collect()
    }

    /// Remove every expired pending reservation, invalidating the
    /// inventory cache for each affected item. Confirmed entries are
    /// immune. Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();

        let expired: Vec<(LockKey, Reservation)> = {
            let mut locks = self.locks.write().unwrap();
            let keys: Vec<LockKey> = locks
                .iter()
                .filter(|(_, r)| r.is_expired(now))
                .map(|(k, _)| k.clone())
                .collect();
            keys.into_iter()
                .filter_map(|k| locks.remove(&k).map(|r| (k, r)))
                .collect()
        };

        for (_, reservation) in &expired {
            self.inventory.invalidate(&reservation.item_id);
            debug!(
                item_id = %reservation.item_id,
                owner = %mask_owner_id(&reservation.owner_id),
                "expired reservation swept"
            );
            self.emit(LockEvent::Expired {
                item_id: reservation.item_id.clone(),
                owner: mask_owner_id(&reservation.owner_id),
                quantity: reservation.quantity,
            });
        }

        expired.len()
    }

    /// Number of entries including expired-but-unswept (for testing)
    pub fn len(&self) -> usize {
        self.locks.read().unwrap().len()
    }

    /// Check if the table is empty (for testing)
    pub fn is_empty(&self) -> bool {
        self.locks.read().unwrap().is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
