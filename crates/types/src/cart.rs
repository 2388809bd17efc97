use serde::{Deserialize, Serialize};

use crate::InvalidLockReason;

/// One line item of a shopper's cart, as seen by the reservation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: String,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(item_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// Outcome of a single secured cart operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOpOutcome {
    /// Lock held and cart mutation applied
    Applied,
    /// Lock could not cover the request; cart untouched
    Rejected { requested: u32, available: u32 },
}

impl CartOpOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CartOpOutcome::Applied)
    }
}

/// One problem found during pre-checkout validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartIssue {
    pub item_id: String,
    pub requested_quantity: u32,
    /// Quantity the existing lock still covers, when one exists
    pub available_quantity: Option<u32>,
    pub reason: InvalidLockReason,
}

/// Aggregated result of validating every line of a cart
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartValidation {
    pub issues: Vec<CartIssue>,
}

impl CartValidation {
    /// The cart may proceed to checkout only with zero issues
    pub fn is_checkout_eligible(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Tally of a best-effort confirm-all or release-all pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartBatchResult {
    /// Items whose lock transition went through
    pub applied: usize,
    /// Items with no matching lock to transition
    pub skipped: Vec<String>,
}

impl CartBatchResult {
    pub fn all_applied(&self) -> bool {
        self.skipped.is_empty()
    }
}
