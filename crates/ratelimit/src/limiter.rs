use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

use stocklock_types::{Clock, SystemClock};

#[derive(Debug, Error)]
pub enum RateLimitError<E> {
    #[error("rate limit exceeded, retry after {retry_after_ms}ms")]
    LimitExceeded { retry_after_ms: u64 },
    #[error("operation failed: {0}")]
    Operation(E),
}

/// Ceilings for the fixed request window.
///
/// The default ceiling applies to every client; trusted client classes
/// (admin tooling, internal batch jobs) get explicit overrides.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Window length in seconds
    pub window_secs: u64,

    /// Requests allowed per window for unlisted clients
    pub default_ceiling: u32,

    /// Per-client ceiling overrides, keyed by client id
    pub client_ceilings: HashMap<String, u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            default_ceiling: 10,
            client_ceilings: HashMap::new(),
        }
    }
}

/// What the limiter decided for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Zero when allowed; otherwise time until the window resets
    pub retry_after_ms: u64,
}

struct WindowCounter {
    window_start_ms: u64,
    count: u32,
}

/// Per-(client, endpoint) fixed-window request throttle.
///
/// Counters are ephemeral: they live for the process lifetime only. This
/// is a best-effort defensive layer in front of the upstream inventory
/// API, not a security boundary.
pub struct RateLimiter {
    config: RateLimitConfig,
    counters: RwLock<HashMap<String, WindowCounter>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            counters: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register a per-client ceiling override
    pub fn with_client_ceiling(mut self, client_id: &str, ceiling: u32) -> Self {
        self.config
            .client_ceilings
            .insert(client_id.to_string(), ceiling);
        self
    }

    fn ceiling_for(&self, client_id: &str) -> u32 {
        self.config
            .client_ceilings
            .get(client_id)
            .copied()
            .unwrap_or(self.config.default_ceiling)
    }

    /// Count one request against `(client_id, endpoint)` and decide
    /// whether it may proceed.
    pub fn check(&self, client_id: &str, endpoint: &str) -> RateLimitDecision {
        let now_ms = self.clock.now_ms();
        let window_ms = self.config.window_secs * 1000;
        let ceiling = self.ceiling_for(client_id);
        let key = format!("{client_id}:{endpoint}");

        let mut counters = self.counters.write().unwrap();
        let counter = counters.entry(key).or_insert(WindowCounter {
            window_start_ms: now_ms,
            count: 0,
        });

        if now_ms.saturating_sub(counter.window_start_ms) >= window_ms {
            counter.window_start_ms = now_ms;
            counter.count = 0;
        }

        if counter.count >= ceiling {
            let retry_after_ms = (counter.window_start_ms + window_ms).saturating_sub(now_ms);
            warn!(
                client_id,
                endpoint, retry_after_ms, "rate limit ceiling reached"
            );
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after_ms,
            };
        }

        counter.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: ceiling - counter.count,
            retry_after_ms: 0,
        }
    }

    /// Requests left for the pair without consuming one
    pub fn remaining(&self, client_id: &str, endpoint: &str) -> u32 {
        let now_ms = self.clock.now_ms();
        let window_ms = self.config.window_secs * 1000;
        let ceiling = self.ceiling_for(client_id);
        let key = format!("{client_id}:{endpoint}");

        let counters = self.counters.read().unwrap();
        match counters.get(&key) {
            Some(counter) if now_ms.saturating_sub(counter.window_start_ms) < window_ms => {
                ceiling.saturating_sub(counter.count)
            }
            _ => ceiling,
        }
    }

    /// Gate an async operation behind the limiter. Fails fast without
    /// polling `operation` when the ceiling is already reached.
    pub async fn with_rate_limit<T, E, F>(
        &self,
        client_id: &str,
        endpoint: &str,
        operation: F,
    ) -> Result<T, RateLimitError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        let decision = self.check(client_id, endpoint);
        if !decision.allowed {
            return Err(RateLimitError::LimitExceeded {
                retry_after_ms: decision.retry_after_ms,
            });
        }
        operation.await.map_err(RateLimitError::Operation)
    }

    /// Clear every counter for one client, across all endpoints.
    /// Administrative recovery and test isolation.
    pub fn reset_client_limits(&self, client_id: &str) {
        let prefix = format!("{client_id}:");
        let mut counters = self.counters.write().unwrap();
        let before = counters.len();
        counters.retain(|key, _| !key.starts_with(&prefix));
        debug!(
            client_id,
            cleared = before - counters.len(),
            "client rate limits reset"
        );
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocklock_types::ManualClock;

    fn limiter_with_clock(ceiling: u32) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let config = RateLimitConfig {
            window_secs: 60,
            default_ceiling: ceiling,
            client_ceilings: HashMap::new(),
        };
        (
            RateLimiter::with_clock(config, clock.clone() as Arc<dyn Clock>),
            clock,
        )
    }

    #[test]
    fn test_allows_up_to_ceiling() {
        let (limiter, _clock) = limiter_with_clock(10);

        for i in 0..10 {
            let decision = limiter.check("client-a", "inventory_query");
            assert!(decision.allowed, "request {i} should be allowed");
        }

        let denied = limiter.check("client-a", "inventory_query");
        assert!(!denied.allowed);
        assert!(denied.retry_after_ms > 0);
    }

    #[test]
    fn test_window_reset_restores_capacity() {
        let (limiter, clock) = limiter_with_clock(2);

        assert!(limiter.check("client-a", "inventory_query").allowed);
        assert!(limiter.check("client-a", "inventory_query").allowed);
        assert!(!limiter.check("client-a", "inventory_query").allowed);

        clock.advance_secs(60);
        assert!(limiter.check("client-a", "inventory_query").allowed);
    }

    #[test]
    fn test_retry_after_counts_down_to_window_end() {
        let (limiter, clock) = limiter_with_clock(1);

        assert!(limiter.check("client-a", "inventory_query").allowed);
        let denied = limiter.check("client-a", "inventory_query");
        assert_eq!(denied.retry_after_ms, 60_000);

        clock.advance_secs(45);
        let denied = limiter.check("client-a", "inventory_query");
        assert_eq!(denied.retry_after_ms, 15_000);
    }

    #[test]
    fn test_endpoints_are_tracked_separately() {
        let (limiter, _clock) = limiter_with_clock(1);

        assert!(limiter.check("client-a", "inventory_query").allowed);
        assert!(!limiter.check("client-a", "inventory_query").allowed);
        assert!(limiter.check("client-a", "cart_mutation").allowed);
    }

    #[test]
    fn test_clients_are_tracked_separately() {
        let (limiter, _clock) = limiter_with_clock(1);

        assert!(limiter.check("client-a", "inventory_query").allowed);
        assert!(!limiter.check("client-a", "inventory_query").allowed);
        assert!(limiter.check("client-b", "inventory_query").allowed);
    }

    #[test]
    fn test_client_ceiling_override() {
        let (limiter, _clock) = limiter_with_clock(1);
        let limiter = limiter.with_client_ceiling("admin", 100);

        for _ in 0..100 {
            assert!(limiter.check("admin", "inventory_query").allowed);
        }
        assert!(!limiter.check("admin", "inventory_query").allowed);

        assert!(limiter.check("shopper", "inventory_query").allowed);
        assert!(!limiter.check("shopper", "inventory_query").allowed);
    }

    #[test]
    fn test_reset_client_limits_clears_all_endpoints() {
        let (limiter, _clock) = limiter_with_clock(1);

        assert!(limiter.check("client-a", "inventory_query").allowed);
        assert!(limiter.check("client-a", "cart_mutation").allowed);
        assert!(!limiter.check("client-a", "inventory_query").allowed);
        assert!(!limiter.check("client-a", "cart_mutation").allowed);

        limiter.reset_client_limits("client-a");

        assert!(limiter.check("client-a", "inventory_query").allowed);
        assert!(limiter.check("client-a", "cart_mutation").allowed);
    }

    #[test]
    fn test_reset_leaves_other_clients_untouched() {
        let (limiter, _clock) = limiter_with_clock(1);

        assert!(limiter.check("client-a", "inventory_query").allowed);
        assert!(limiter.check("client-b", "inventory_query").allowed);

        limiter.reset_client_limits("client-a");

        assert!(limiter.check("client-a", "inventory_query").allowed);
        assert!(!limiter.check("client-b", "inventory_query").allowed);
    }

    #[test]
    fn test_remaining_does_not_consume() {
        let (limiter, _clock) = limiter_with_clock(5);

        assert_eq!(limiter.remaining("client-a", "inventory_query"), 5);
        assert_eq!(limiter.remaining("client-a", "inventory_query"), 5);

        limiter.check("client-a", "inventory_query");
        assert_eq!(limiter.remaining("client-a", "inventory_query"), 4);
    }

    #[tokio::test]
    async fn test_with_rate_limit_runs_operation() {
        let (limiter, _clock) = limiter_with_clock(5);

        let result: Result<u32, RateLimitError<&str>> = limiter
            .with_rate_limit("client-a", "inventory_query", async { Ok(42) })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_rate_limit_fails_fast_over_ceiling() {
        let (limiter, _clock) = limiter_with_clock(1);
        limiter.check("client-a", "inventory_query");

        let result: Result<u32, RateLimitError<&str>> = limiter
            .with_rate_limit("client-a", "inventory_query", async {
                panic!("operation must not run once the ceiling is reached")
            })
            .await;

        match result {
            Err(RateLimitError::LimitExceeded { retry_after_ms }) => {
                assert!(retry_after_ms > 0);
            }
            other => panic!("expected LimitExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_with_rate_limit_propagates_operation_error() {
        let (limiter, _clock) = limiter_with_clock(5);

        let result: Result<u32, RateLimitError<&str>> = limiter
            .with_rate_limit("client-a", "inventory_query", async { Err("boom") })
            .await;

        assert!(matches!(result, Err(RateLimitError::Operation("boom"))));
    }
}
