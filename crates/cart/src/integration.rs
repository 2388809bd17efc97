use std::sync::Arc;

use tracing::{info, warn};

use stocklock_inventory::InventoryProvider;
use stocklock_reservation::ReservationTable;
use stocklock_session::SessionManager;
use stocklock_types::{
    mask_owner_id, AcquireOutcome, CartBatchResult, CartIssue, CartLine, CartOpOutcome,
    CartValidation, InvalidLockReason, LockEvent, LockValidation,
};

use crate::backend::{CartBackend, CartError};

/// Orchestrates cart mutations behind reservation transitions.
///
/// Every mutation that claims stock goes lock-first: the cart is only
/// touched once the reservation table has granted capacity, and a lock
/// taken for a mutation that then fails is handed back. The integration
/// holds no reservation state of its own.
pub struct SecureCart<P: InventoryProvider, B: CartBackend> {
    table: Arc<ReservationTable<P>>,
    backend: Arc<B>,
    sessions: Arc<SessionManager>,
}

impl<P: InventoryProvider, B: CartBackend> SecureCart<P, B> {
    pub fn new(
        table: Arc<ReservationTable<P>>,
        backend: Arc<B>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            table,
            backend,
            sessions,
        }
    }

    /// Reject lock-claiming operations from ended or idled-out sessions
    fn ensure_active(&self, session_id: &str) -> Result<(), CartError> {
        if self.sessions.touch(session_id) {
            Ok(())
        } else {
            Err(CartError::InactiveSession(mask_owner_id(session_id)))
        }
    }

    /// Reserve stock, then add to the cart. The cart is never mutated
    /// when the reservation is refused, and the lock is handed back when
    /// the cart mutation itself fails.
    pub async fn secure_add_to_cart(
        &self,
        session_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<CartOpOutcome, CartError> {
        self.ensure_active(session_id)?;

        match self.table.acquire(item_id, quantity, session_id).await? {
            AcquireOutcome::Insufficient {
                requested,
                available,
            } => Ok(CartOpOutcome::Rejected {
                requested,
                available,
            }),
            AcquireOutcome::Granted { .. } => {
                match self.backend.add_item(session_id, item_id, quantity).await {
                    Ok(()) => Ok(CartOpOutcome::Applied),
                    Err(err) => {
                        self.table.release(item_id, session_id);
                        Err(err)
                    }
                }
            }
        }
    }

    /// Change a line's quantity. The held lock is reused when it still
    /// covers the new quantity; otherwise a fresh acquisition is
    /// attempted, and on refusal the cart keeps its prior quantity.
    pub async fn secure_update_cart_item(
        &self,
        session_id: &str,
        item_id: &str,
        new_quantity: u32,
    ) -> Result<CartOpOutcome, CartError> {
        self.ensure_active(session_id)?;

        if let LockValidation::Invalid { .. } =
            self.table.validate(item_id, session_id, new_quantity)
        {
            if let AcquireOutcome::Insufficient {
                requested,
                available,
            } = self.table.acquire(item_id, new_quantity, session_id).await?
            {
                return Ok(CartOpOutcome::Rejected {
                    requested,
                    available,
                });
            }
        }

        self.backend
            .update_item(session_id, item_id, new_quantity)
            .await?;
        Ok(CartOpOutcome::Applied)
    }

    /// Remove a line and hand back its lock. The release happens even
    /// when the cart mutation fails, so a later retry never runs against
    /// a stale abandoned reservation. This is a cleanup path and is not
    /// gated on session activity.
    pub async fn secure_remove_from_cart(
        &self,
        session_id: &str,
        item_id: &str,
    ) -> Result<(), CartError> {
        let backend_result = self.backend.remove_item(session_id, item_id).await;
        let released = self.table.release(item_id, session_id);

        if let Err(err) = &backend_result {
            warn!(
                item_id,
                owner = %mask_owner_id(session_id),
                released,
                error = %err,
                "cart removal failed, reservation released anyway"
            );
        }
        backend_result
    }

    /// Pre-checkout validation of every line. The cart is checkout
    /// eligible only when the issues list comes back empty.
    pub fn validate_cart_inventory(&self, session_id: &str, lines: &[CartLine]) -> CartValidation {
        let mut issues = Vec::new();

        for line in lines {
            match self.table.validate(&line.item_id, session_id, line.quantity) {
                LockValidation::Valid { .. } => {}
                LockValidation::Invalid { reason } => {
                    let available_quantity = match reason {
                        InvalidLockReason::InsufficientQuantity { held, .. } => Some(held),
                        _ => None,
                    };
                    issues.push(CartIssue {
                        item_id: line.item_id.clone(),
                        requested_quantity: line.quantity,
                        available_quantity,
                        reason,
                    });
                }
            }
        }

        info!(
            owner = %mask_owner_id(session_id),
            lines = lines.len(),
            issues = issues.len(),
            "cart validation completed"
        );
        let _ = self.table.event_sender().send(LockEvent::CartValidated {
            owner: mask_owner_id(session_id),
            issue_count: issues.len(),
        });

        CartValidation { issues }
    }

    /// Confirm every line's lock at checkout commit. Best effort: a line
    /// that cannot be confirmed is logged and the rest still proceed.
    pub fn confirm_cart_locks(&self, session_id: &str, lines: &[CartLine]) -> CartBatchResult {
        let mut result = CartBatchResult::default();
        for line in lines {
            if self.table.confirm(&line.item_id, session_id) {
                result.applied += 1;
            } else {
                warn!(
                    item_id = %line.item_id,
                    owner = %mask_owner_id(session_id),
                    "confirm skipped, no valid reservation"
                );
                result.skipped.push(line.item_id.clone());
            }
        }
        result
    }

    /// Release every line's lock on checkout abort. Best effort and
    /// idempotent; lines without a reservation are counted, not errors.
    pub fn release_cart_locks(&self, session_id: &str, lines: &[CartLine]) -> CartBatchResult {
        let mut result = CartBatchResult::default();
        for line in lines {
            if self.table.release(&line.item_id, session_id) {
                result.applied += 1;
            } else {
                result.skipped.push(line.item_id.clone());
            }
        }
        result
    }
}
