use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use stocklock_reservation::ReservationError;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("session is not active: {0}")]
    InactiveSession(String),

    #[error("cart backend failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Reservation(#[from] ReservationError),
}

/// External cart mutations, invoked only after the corresponding lock
/// transition. The integration cares about success or failure only.
#[async_trait]
pub trait CartBackend: Send + Sync {
    async fn add_item(&self, owner_id: &str, item_id: &str, quantity: u32) -> Result<(), CartError>;
    async fn update_item(
        &self,
        owner_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), CartError>;
    async fn remove_item(&self, owner_id: &str, item_id: &str) -> Result<(), CartError>;
}

/// Cart backend backed by per-owner maps (for testing)
#[derive(Debug, Default)]
pub struct InMemoryCart {
    carts: RwLock<HashMap<String, HashMap<String, u32>>>,
    should_fail: RwLock<bool>,
}

impl InMemoryCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().unwrap() = fail;
    }

    pub fn quantity(&self, owner_id: &str, item_id: &str) -> Option<u32> {
        self.carts
            .read()
            .unwrap()
            .get(owner_id)
            .and_then(|cart| cart.get(item_id))
            .copied()
    }

    fn fail_if_requested(&self) -> Result<(), CartError> {
        if *self.should_fail.read().unwrap() {
            Err(CartError::Backend("simulated cart failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CartBackend for InMemoryCart {
    async fn add_item(&self, owner_id: &str, item_id: &str, quantity: u32) -> Result<(), CartError> {
        self.fail_if_requested()?;
        self.carts
            .write()
            .unwrap()
            .entry(owner_id.to_string())
            .or_default()
            .insert(item_id.to_string(), quantity);
        Ok(())
    }

    async fn update_item(
        &self,
        owner_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), CartError> {
        self.fail_if_requested()?;
        self.carts
            .write()
            .unwrap()
            .entry(owner_id.to_string())
            .or_default()
            .insert(item_id.to_string(), quantity);
        Ok(())
    }

    async fn remove_item(&self, owner_id: &str, item_id: &str) -> Result<(), CartError> {
        self.fail_if_requested()?;
        if let Some(cart) = self.carts.write().unwrap().get_mut(owner_id) {
            cart.remove(item_id);
        }
        Ok(())
    }
}
