//! Session identity for the stocklock reservation system
//!
//! Issues the opaque owner ids that correlate every reservation call of
//! one checkout flow. An id stays valid until the flow completes or the
//! shopper signs out; ending a session prevents a stale id from claiming
//! locks after the flow is over.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use stocklock_types::{mask_owner_id, Clock, SystemClock};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sessions idle for longer than this are treated as ended
    pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 1800, // 30 minutes
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub created_at: u64,
    pub last_seen_at: u64,
}

/// Issues and tracks opaque session identifiers.
///
/// Ids are 16 random bytes, hex encoded. The manager never hands out the
/// same id twice and forgets an id the moment the session ends.
pub struct SessionManager {
    config: SessionConfig,
    sessions: RwLock<HashMap<String, SessionRecord>>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Issue a fresh session id and start tracking it
    pub fn start_session(&self) -> String {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes).expect("system entropy unavailable");
        let id = format!("sess-{}", hex::encode(bytes));

        let now = self.clock.now();
        self.sessions.write().unwrap().insert(
            id.clone(),
            SessionRecord {
                id: id.clone(),
                created_at: now,
                last_seen_at: now,
            },
        );

        info!(session = %mask_owner_id(&id), "session started");
        id
    }

    /// Refresh the idle timer. Returns `false` for unknown or ended ids.
    pub fn touch(&self, session_id: &str) -> bool {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(session_id) {
            Some(record) if now.saturating_sub(record.last_seen_at) < self.config.idle_ttl_secs => {
                record.last_seen_at = now;
                true
            }
            _ => false,
        }
    }

    /// A session is active when it exists and has not idled out
    pub fn is_active(&self, session_id: &str) -> bool {
        let now = self.clock.now();
        let sessions = self.sessions.read().unwrap();
        sessions
            .get(session_id)
            .map(|record| now.saturating_sub(record.last_seen_at) < self.config.idle_ttl_secs)
            .unwrap_or(false)
    }

    /// End a session on checkout completion or sign-out. Idempotent.
    pub fn end_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().unwrap().remove(session_id).is_some();
        if removed {
            info!(session = %mask_owner_id(session_id), "session ended");
        }
        removed
    }

    /// Drop every session past its idle TTL. Returns how many were removed.
    pub fn prune_idle(&self) -> usize {
        let now = self.clock.now();
        let idle_ttl = self.config.idle_ttl_secs;
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, record| now.saturating_sub(record.last_seen_at) < idle_ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "idle sessions pruned");
        }
        removed
    }

    /// Number of tracked sessions (for testing)
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Check if no sessions are tracked (for testing)
    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocklock_types::ManualClock;

    fn manager() -> (SessionManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (
            SessionManager::with_clock(SessionConfig::default(), clock.clone() as Arc<dyn Clock>),
            clock,
        )
    }

    #[test]
    fn test_start_session_issues_unique_ids() {
        let (manager, _clock) = manager();
        let a = manager.start_session();
        let b = manager.start_session();

        assert_ne!(a, b);
        assert!(a.starts_with("sess-"));
        assert_eq!(a.len(), "sess-".len() + 32);
        assert!(manager.is_active(&a));
        assert!(manager.is_active(&b));
    }

    #[test]
    fn test_end_session_deactivates_id() {
        let (manager, _clock) = manager();
        let id = manager.start_session();

        assert!(manager.end_session(&id));
        assert!(!manager.is_active(&id));
        assert!(!manager.end_session(&id));
        assert!(!manager.touch(&id));
    }

    #[test]
    fn test_idle_session_expires() {
        let (manager, clock) = manager();
        let id = manager.start_session();

        clock.advance_secs(1799);
        assert!(manager.is_active(&id));
        assert!(manager.touch(&id));

        // The touch reset the idle timer
        clock.advance_secs(1799);
        assert!(manager.is_active(&id));

        clock.advance_secs(2);
        assert!(!manager.is_active(&id));
        assert!(!manager.touch(&id));
    }

    #[test]
    fn test_prune_idle_removes_only_stale_sessions() {
        let (manager, clock) = manager();
        let stale = manager.start_session();

        clock.advance_secs(1801);
        let fresh = manager.start_session();

        assert_eq!(manager.prune_idle(), 1);
        assert_eq!(manager.len(), 1);
        assert!(!manager.is_active(&stale));
        assert!(manager.is_active(&fresh));
    }

    #[test]
    fn test_unknown_id_is_inactive() {
        let (manager, _clock) = manager();
        assert!(!manager.is_active("sess-feedfacefeedfacefeedfacefeedface"));
    }
}
