//! Stocklock: in-process inventory reservations for checkout flows
//!
//! Facade crate re-exporting the component crates:
//!
//! - `stocklock-types`: reservation, cart, and event data model
//! - `stocklock-ratelimit`: per-(client, endpoint) request throttle
//! - `stocklock-inventory`: deduplicated, cached on-hand quantity reads
//! - `stocklock-reservation`: the reservation table and expiry sweeper
//! - `stocklock-cart`: lock-first cart orchestration
//! - `stocklock-session`: opaque session identity
//! - `stocklock-config`: validated configuration with hot reload

pub use stocklock_cart::{CartBackend, CartError, InMemoryCart, SecureCart};
pub use stocklock_config::{
    validate_config, AppConfig, ConfigLoader, ConfigWatcher, InventorySettings, RateLimitSettings,
    ReservationSettings, ServiceConfig, SessionSettings,
};
pub use stocklock_inventory::{
    InventoryError, InventoryProvider, InventoryQuery, InventoryQueryConfig, StaticInventory,
};
pub use stocklock_ratelimit::{RateLimitConfig, RateLimitDecision, RateLimitError, RateLimiter};
pub use stocklock_reservation::{
    ReservationConfig, ReservationError, ReservationTable, SweeperHandle, INVENTORY_ENDPOINT,
};
pub use stocklock_session::{SessionConfig, SessionManager, SessionRecord};
pub use stocklock_types::*;
