use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Time source for every component that does TTL or window arithmetic.
///
/// Services take an `Arc<dyn Clock>` at construction so tests can drive
/// expiry deterministically instead of sleeping.
pub trait Clock: Send + Sync {
    /// Current time as epoch seconds
    fn now(&self) -> u64;

    /// Current time as epoch milliseconds
    fn now_ms(&self) -> u64;
}

/// Wall-clock time via chrono
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        Utc::now().timestamp() as u64
    }

    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis() as u64
    }
}

/// Manually advanced clock (for testing)
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_secs: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_secs * 1000),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now_ms.fetch_add(secs * 1000, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set_secs(&self, secs: u64) {
        self.now_ms.store(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst) / 1000
    }

    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
