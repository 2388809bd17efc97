use stocklock_inventory::InventoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("reservation quantity must be at least 1")]
    ZeroQuantity,

    #[error("rate limit exceeded, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("inventory query failed: {0}")]
    Inventory(#[from] InventoryError),
}
