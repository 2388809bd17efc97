use serde::{Deserialize, Serialize};

/// Reservation lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Held but not yet committed; subject to TTL expiry
    Pending,
    /// Checkout committed; immune to the expiry sweep
    Confirmed,
    /// Explicitly released by the owner
    Released,
    /// TTL elapsed before confirmation
    Expired,
}

/// A time-bounded claim on a quantity of one item by one session.
///
/// At most one reservation exists per `(item_id, owner_id)` pair;
/// re-acquisition updates the entry in place rather than duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Identifier of the purchasable unit (catalog variation)
    pub item_id: String,

    /// Units reserved, always >= 1
    pub quantity: u32,

    /// Session that holds the reservation
    pub owner_id: String,

    pub created_at: u64,

    /// `created_at + ttl`, refreshed on re-acquire
    pub expires_at: u64,

    pub status: ReservationStatus,
}

impl Reservation {
    pub fn new(
        item_id: impl Into<String>,
        quantity: u32,
        owner_id: impl Into<String>,
        created_at: u64,
        ttl_secs: u64,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
            owner_id: owner_id.into(),
            created_at,
            expires_at: created_at + ttl_secs,
            status: ReservationStatus::Pending,
        }
    }

    /// Pending past its deadline and not yet swept. Confirmed
    /// reservations never expire.
    pub fn is_expired(&self, current_time: u64) -> bool {
        matches!(self.status, ReservationStatus::Pending) && current_time >= self.expires_at
    }

    /// Still counts against the item's available quantity
    pub fn is_active(&self, current_time: u64) -> bool {
        match self.status {
            ReservationStatus::Pending => current_time < self.expires_at,
            ReservationStatus::Confirmed => true,
            ReservationStatus::Released | ReservationStatus::Expired => false,
        }
    }

    /// Re-acquisition: raise the held quantity to at least `requested`
    /// and push the deadline out by a full TTL.
    pub fn extend(&mut self, requested: u32, current_time: u64, ttl_secs: u64) {
        self.quantity = self.quantity.max(requested);
        self.expires_at = current_time + ttl_secs;
    }
}

/// Result of an acquisition attempt.
///
/// Running out of stock is an expected outcome, not an error, so callers
/// can surface the remaining quantity to the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    Granted { reservation: Reservation },
    Insufficient { requested: u32, available: u32 },
}

impl AcquireOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AcquireOutcome::Granted { .. })
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            AcquireOutcome::Granted { reservation } => Some(reservation),
            AcquireOutcome::Insufficient { .. } => None,
        }
    }
}

/// Why a held lock no longer covers the caller's requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidLockReason {
    /// No entry for this `(item, owner)` pair
    NotFound,
    /// TTL elapsed but the sweep has not removed the entry yet
    Expired,
    /// Entry's quantity is below what is now required
    InsufficientQuantity { held: u32, required: u32 },
}

/// Result of validating an existing lock against a required quantity
#[derive(Debug, Clone, PartialEq)]
pub enum LockValidation {
    Valid { reservation: Reservation },
    Invalid { reason: InvalidLockReason },
}

impl LockValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, LockValidation::Valid { .. })
    }

    pub fn reason(&self) -> Option<InvalidLockReason> {
        match self {
            LockValidation::Valid { .. } => None,
            LockValidation::Invalid { reason } => Some(*reason),
        }
    }
}
