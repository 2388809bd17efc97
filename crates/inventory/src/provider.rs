use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("upstream inventory query failed: {0}")]
    Upstream(String),

    #[error("unknown item: {0}")]
    UnknownItem(String),
}

/// Remote "current on-hand quantity" read.
///
/// The quantity is the externally reported total stock count for an item,
/// independent of any reservations. Calls may fail; the facade does not
/// retry — retry policy belongs to the caller.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn fetch_on_hand(&self, item_id: &str) -> Result<u32, InventoryError>;
}

/// In-memory provider backed by a quantity map (for testing).
///
/// Tracks how many fetches reached it so dedup behavior is observable,
/// and can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct StaticInventory {
    quantities: RwLock<HashMap<String, u32>>,
    fetch_count: AtomicU64,
    should_fail: RwLock<bool>,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, item_id: &str, quantity: u32) {
        self.quantities
            .write()
            .unwrap()
            .insert(item_id.to_string(), quantity);
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().unwrap() = fail;
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryProvider for StaticInventory {
    async fn fetch_on_hand(&self, item_id: &str) -> Result<u32, InventoryError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if *self.should_fail.read().unwrap() {
            return Err(InventoryError::Upstream("simulated outage".to_string()));
        }

        self.quantities
            .read()
            .unwrap()
            .get(item_id)
            .copied()
            .ok_or_else(|| InventoryError::UnknownItem(item_id.to_string()))
    }
}
