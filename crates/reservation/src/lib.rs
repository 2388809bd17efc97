//! Reservation table (lock manager) for the stocklock system
//!
//! Owns the in-memory map of active reservations keyed by
//! `(item_id, owner_id)` and every lifecycle transition:
//!
//! - `acquire`: per-item critical section around the availability check,
//!   so concurrent shoppers cannot both reserve the last unit
//! - `validate` / `confirm` / `release`: single-entry operations, safe to
//!   interleave freely
//! - `start_sweeper`: periodic removal of expired pending reservations
//!
//! Inventory reads go through the `stocklock-inventory` facade and are
//! gated by the `stocklock-ratelimit` limiter, keyed by the owning
//! session.

pub mod error;
pub mod sweeper;
pub mod table;

pub use error::ReservationError;
pub use sweeper::SweeperHandle;
pub use table::{ReservationConfig, ReservationTable, INVENTORY_ENDPOINT};
