//! Request throttling for the stocklock reservation system
//!
//! This crate provides the rate limiter that sits between the reservation
//! table and the upstream inventory API:
//!
//! - `RateLimiter`: fixed-window limiting per (client, endpoint) pair
//! - `with_rate_limit`: fail-fast wrapper for arbitrary async operations
//! - `reset_client_limits`: administrative recovery per client

pub mod limiter;

pub use limiter::{RateLimitConfig, RateLimitDecision, RateLimitError, RateLimiter};
