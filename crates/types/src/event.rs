use serde::{Deserialize, Serialize};

/// Domain events published for UI and observability collaborators.
///
/// Owner ids are masked before they enter an event payload; subscribers
/// never see a full session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LockEvent {
    Acquired {
        item_id: String,
        owner: String,
        quantity: u32,
        expires_at: u64,
    },
    Extended {
        item_id: String,
        owner: String,
        quantity: u32,
        expires_at: u64,
    },
    Confirmed {
        item_id: String,
        owner: String,
    },
    Released {
        item_id: String,
        owner: String,
    },
    Expired {
        item_id: String,
        owner: String,
        quantity: u32,
    },
    RateLimited {
        client: String,
        endpoint: String,
        retry_after_ms: u64,
    },
    CartValidated {
        owner: String,
        issue_count: usize,
    },
}

/// Partially mask a session id for event payloads and log lines.
///
/// Keeps enough of the prefix to correlate events from one flow without
/// exposing a token that could be replayed.
pub fn mask_owner_id(id: &str) -> String {
    const VISIBLE: usize = 8;
    let visible: String = id.chars().take(VISIBLE).collect();
    if id.chars().count() > VISIBLE {
        format!("{visible}…")
    } else {
        visible
    }
}
