//! Core configuration structures for the stocklock reservation system

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Service-level configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Reservation table configuration
    #[serde(default)]
    pub reservation: ReservationSettings,

    /// Rate limiter configuration
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Inventory query facade configuration
    #[serde(default)]
    pub inventory: InventorySettings,

    /// Session manager configuration
    #[serde(default)]
    pub session: SessionSettings,
}

/// Service environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Environment type (production, staging, local)
    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Local,
}

/// Reservation table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationSettings {
    /// Lifetime of an unconfirmed reservation in seconds
    #[serde(default = "default_reservation_ttl_secs")]
    pub ttl_secs: u64,

    /// Expiry sweep cadence in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Treat the item as available when the upstream inventory query
    /// fails. Defaults to false (fail closed).
    #[serde(default)]
    pub fail_open: bool,
}

/// Rate limiter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Requests allowed per window for unlisted clients
    #[serde(default = "default_ceiling")]
    pub default_ceiling: u32,

    /// Per-client ceiling overrides for trusted client classes
    #[serde(default)]
    pub client_ceilings: HashMap<String, u32>,
}

/// Inventory query facade settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySettings {
    /// On-hand quantity cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

/// Session manager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Idle lifetime of a session in seconds
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

// Default value functions
fn default_environment() -> Environment {
    Environment::Local
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reservation_ttl_secs() -> u64 {
    600 // 10 minutes
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_window_secs() -> u64 {
    60
}

fn default_ceiling() -> u32 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_idle_ttl_secs() -> u64 {
    1800 // 30 minutes
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ReservationSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_reservation_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            fail_open: false,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            default_ceiling: default_ceiling(),
            client_ceilings: HashMap::new(),
        }
    }
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}
