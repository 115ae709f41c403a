//! Purchase admission: the full submit pipeline.
//!
//! One controller owns the ledger, the reservation manager, the idempotency
//! guard and a handle to the durable store, and drives a submission through
//! them in a fixed order:
//!
//! 1. idempotency lookup: a replayed key returns the original record with
//!    no side effects
//! 2. hold: claims capacity or rejects `SoldOut` with no side effects
//! 3. price: `unit_price * quantity` in minor-unit integer arithmetic
//! 4. commit: the hold's units move from reserved to sold
//! 5. persist: the confirmed record is appended to the store, outside
//!    every lock; a failed append reverts the sale
//! 6. bind: the idempotency key is bound to the new purchase
//!
//! Every early exit after step 2 undoes the increments it made, so a
//! rejection never leaks capacity.

use crate::config::EngineConfig;
use crate::idempotency::IdempotencyGuard;
use crate::ledger::{ClassCounts, InventoryLedger};
use crate::metrics;
use crate::reservation::ReservationManager;
use std::sync::Arc;
use turnstile_core::{
    Clock, IdempotencyKey, PurchaseId, PurchaseRecord, PurchaseStatus, PurchaseStore,
    PurchaseStoreError, RegistrationError, RejectionReason, RequesterId, Reservation,
    ReservationId, TicketClass, TicketClassId, TicketCode,
};

/// One purchase submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseRequest {
    /// Client-generated token that deduplicates retries
    pub idempotency_key: IdempotencyKey,
    /// Ticket class to purchase
    pub ticket_class_id: TicketClassId,
    /// Units requested
    pub quantity: u32,
    /// Who is purchasing
    pub requester: RequesterId,
}

/// Coordinates ledger, reservations, idempotency and persistence for the
/// purchase lifecycle.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and the
/// internal structures are safe under concurrent callers.
pub struct AdmissionController {
    ledger: Arc<InventoryLedger>,
    reservations: ReservationManager,
    guard: IdempotencyGuard,
    store: Arc<dyn PurchaseStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl AdmissionController {
    /// Creates a controller over the given store and clock.
    #[must_use]
    pub fn new(store: Arc<dyn PurchaseStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let ledger = Arc::new(InventoryLedger::new());
        let reservations = ReservationManager::new(
            Arc::clone(&ledger),
            Arc::clone(&clock),
            config.max_units_per_purchase,
        );
        Self {
            ledger,
            reservations,
            guard: IdempotencyGuard::new(),
            store,
            clock,
            config,
        }
    }

    /// Registers a ticket class for sale.
    ///
    /// # Errors
    ///
    /// See [`RegistrationError`].
    pub fn register_class(&self, class: TicketClass) -> Result<(), RegistrationError> {
        self.ledger.register(class)
    }

    /// Immutable metadata for a registered class.
    #[must_use]
    pub fn class(&self, id: &TicketClassId) -> Option<TicketClass> {
        self.ledger.class(id)
    }

    /// Units currently purchasable for a class, lapsed holds swept.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::NotFound`] for an unknown class.
    pub fn available(&self, id: &TicketClassId) -> Result<u32, RejectionReason> {
        self.reservations.available(id)
    }

    /// Counter snapshot for a class (sold, reserved, total).
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::NotFound`] for an unknown class.
    pub fn counts(&self, id: &TicketClassId) -> Result<ClassCounts, RejectionReason> {
        self.reservations.sweep();
        self.ledger.counts(id)
    }

    /// Takes a hold with the configured TTL, for a checkout flow that wants
    /// to claim capacity before collecting payment details.
    ///
    /// # Errors
    ///
    /// See [`ReservationManager::hold`].
    pub fn hold(
        &self,
        ticket_class_id: TicketClassId,
        quantity: u32,
        requester: RequesterId,
    ) -> Result<Reservation, RejectionReason> {
        self.reservations
            .hold(ticket_class_id, quantity, requester, self.config.hold_ttl())
    }

    /// Gives a hold back before expiry.
    ///
    /// # Errors
    ///
    /// See [`ReservationManager::release`].
    pub fn release(&self, id: &ReservationId) -> Result<(), RejectionReason> {
        self.reservations.release(id)
    }

    /// Expires lapsed holds now instead of waiting for the next access.
    pub fn sweep(&self) -> usize {
        self.reservations.sweep()
    }

    /// Submits a purchase. Returns the confirmed record, or the original
    /// record when the idempotency key has been seen before.
    ///
    /// # Errors
    ///
    /// - [`RejectionReason::NotFound`]: unknown ticket class
    /// - [`RejectionReason::InvalidQuantity`]: zero or above the limit
    /// - [`RejectionReason::SoldOut`]: not enough capacity, with the
    ///   remaining quantity
    /// - [`RejectionReason::InternalInventoryError`]: accounting or
    ///   persistence failed after the hold; all increments were undone and
    ///   the same key may be resubmitted
    ///
    /// A submission that loses a same-key race to a concurrent twin is not
    /// an error: it unwinds its own increments and returns the winner's
    /// record, the same as a replay.
    pub async fn submit(&self, request: PurchaseRequest) -> Result<PurchaseRecord, RejectionReason> {
        if let Some(existing) = self.guard.lookup(&request.idempotency_key) {
            return self.replay(existing).await;
        }

        let class = self
            .ledger
            .class(&request.ticket_class_id)
            .ok_or_else(|| {
                metrics::record_purchase_rejected("not_found");
                RejectionReason::NotFound(format!("ticket class {}", request.ticket_class_id))
            })?;

        let reservation = self
            .reservations
            .hold(
                request.ticket_class_id,
                request.quantity,
                request.requester,
                self.config.hold_ttl(),
            )
            .inspect_err(|reason| metrics::record_purchase_rejected(reject_label(reason)))?;

        // Minor-unit integer arithmetic; u64 cents * u32 quantity cannot
        // overflow for any realistic price, but the failure path still
        // returns the hold.
        let Some(total) = class.unit_price.checked_multiply(request.quantity) else {
            let _ = self.reservations.release(&reservation.id);
            tracing::error!(
                ticket_class = %request.ticket_class_id,
                quantity = request.quantity,
                unit_price_cents = class.unit_price.cents(),
                "total overflowed minor-unit arithmetic"
            );
            metrics::record_purchase_rejected("internal");
            return Err(RejectionReason::InternalInventoryError);
        };

        let committed = match self.reservations.commit(&reservation.id) {
            Ok(committed) => committed,
            Err(reason) => {
                let _ = self.reservations.release(&reservation.id);
                metrics::record_purchase_rejected(reject_label(&reason));
                return Err(reason);
            }
        };

        let now = self.clock.now();
        let purchase_id = PurchaseId::new();
        let record = PurchaseRecord::confirmed(
            purchase_id,
            request.requester,
            request.ticket_class_id,
            committed.quantity,
            class.unit_price,
            total,
            request.idempotency_key.clone(),
            TicketCode::issue(purchase_id, now),
            now,
        );

        // The durable write happens outside every lock; a failure here undoes
        // the sale so no capacity is lost.
        if let Err(err) = self.store.append(record.clone()).await {
            self.reservations.revoke(&reservation.id);
            tracing::error!(purchase = %purchase_id, error = %err, "purchase append failed, sale reverted");
            metrics::record_purchase_rejected("internal");
            return Err(RejectionReason::InternalInventoryError);
        }

        if self
            .guard
            .bind(request.idempotency_key.clone(), purchase_id)
            .is_err()
        {
            // Lost a same-key race after the pre-flight lookup. The winner's
            // record stands; this one is unwound and marked failed, and the
            // caller gets the winner's record, exactly as a replay would.
            self.reservations.revoke(&reservation.id);
            if let Err(err) = self
                .store
                .transition_status(purchase_id, PurchaseStatus::Confirmed, PurchaseStatus::Failed)
                .await
            {
                tracing::warn!(purchase = %purchase_id, error = %err, "could not mark duplicate purchase failed");
            }
            tracing::warn!(purchase = %purchase_id, "lost same-key race, replaying the winner");
            if let Some(winner) = self.guard.lookup(&request.idempotency_key) {
                return self.replay(winner).await;
            }
            // A failed bind means the key is occupied, so this is
            // unreachable without a guard bug.
            metrics::record_purchase_rejected("conflict");
            return Err(RejectionReason::Conflict);
        }
        self.reservations.settle(&reservation.id);

        tracing::debug!(
            purchase = %purchase_id,
            ticket_class = %request.ticket_class_id,
            quantity = record.quantity,
            total_cents = record.total_amount.cents(),
            "purchase confirmed"
        );
        metrics::record_purchase_confirmed(record.quantity, record.total_amount.cents());
        Ok(record)
    }

    /// Refunds a confirmed purchase: status flips to `Refunded` and the
    /// units return to the available pool.
    ///
    /// Refunding an already-refunded purchase is a no-op returning the
    /// record.
    ///
    /// # Errors
    ///
    /// - [`RejectionReason::NotFound`]: unknown purchase id
    /// - [`RejectionReason::Conflict`]: the purchase is not in a refundable
    ///   state
    /// - [`RejectionReason::InternalInventoryError`]: the store failed
    pub async fn refund(&self, id: PurchaseId) -> Result<PurchaseRecord, RejectionReason> {
        let mut record = self
            .store
            .get(id)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| RejectionReason::NotFound(format!("purchase {id}")))?;

        match record.status {
            PurchaseStatus::Confirmed => {}
            PurchaseStatus::Refunded => return Ok(record),
            PurchaseStatus::Pending | PurchaseStatus::Failed => {
                tracing::warn!(purchase = %id, status = ?record.status, "refund on a non-refundable purchase");
                return Err(RejectionReason::Conflict);
            }
        }

        // The compare-and-set gives concurrent refunds of one purchase a
        // single winner; only the winner credits the ledger.
        let won = self
            .store
            .transition_status(id, PurchaseStatus::Confirmed, PurchaseStatus::Refunded)
            .await
            .map_err(store_failure)?;
        if !won {
            let current = self
                .store
                .get(id)
                .await
                .map_err(store_failure)?
                .ok_or_else(|| RejectionReason::NotFound(format!("purchase {id}")))?;
            if current.status == PurchaseStatus::Refunded {
                return Ok(current);
            }
            tracing::warn!(purchase = %id, status = ?current.status, "refund lost to a concurrent transition");
            return Err(RejectionReason::Conflict);
        }

        if let Err(reason) = self
            .ledger
            .revert_sale(&record.ticket_class_id, record.quantity)
        {
            // The record is refunded either way; only the capacity return
            // failed (class no longer registered).
            tracing::warn!(purchase = %id, %reason, "refund could not return capacity");
        }

        record.status = PurchaseStatus::Refunded;
        tracing::debug!(purchase = %id, quantity = record.quantity, "purchase refunded");
        metrics::record_purchase_refunded(record.total_amount.cents());
        Ok(record)
    }

    /// Every purchase made by a requester, newest first.
    ///
    /// `Failed` records (the unwound losers of same-key races) are not
    /// purchases and are filtered out.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::InternalInventoryError`] if the store
    /// fails.
    pub async fn purchases_for(
        &self,
        requester: RequesterId,
    ) -> Result<Vec<PurchaseRecord>, RejectionReason> {
        let mut records = self
            .store
            .list_for_requester(requester)
            .await
            .map_err(store_failure)?;
        records.retain(|record| record.status != PurchaseStatus::Failed);
        Ok(records)
    }

    async fn replay(&self, existing: PurchaseId) -> Result<PurchaseRecord, RejectionReason> {
        match self.store.get(existing).await {
            Ok(Some(record)) => {
                tracing::debug!(purchase = %existing, "idempotent replay");
                metrics::record_purchase_replayed();
                Ok(record)
            }
            Ok(None) => {
                // A bound key always has a persisted record behind it.
                tracing::error!(purchase = %existing, "idempotency binding with no stored record");
                Err(RejectionReason::InternalInventoryError)
            }
            Err(err) => Err(store_failure(err)),
        }
    }
}

fn store_failure(err: PurchaseStoreError) -> RejectionReason {
    tracing::error!(error = %err, "purchase store failure");
    RejectionReason::InternalInventoryError
}

const fn reject_label(reason: &RejectionReason) -> &'static str {
    match reason {
        RejectionReason::NotFound(_) => "not_found",
        RejectionReason::SoldOut { .. } => "sold_out",
        RejectionReason::InvalidQuantity { .. } => "invalid_quantity",
        RejectionReason::Conflict => "conflict",
        RejectionReason::InternalInventoryError => "internal",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reject_labels_are_stable() {
        assert_eq!(
            reject_label(&RejectionReason::SoldOut { available: 0 }),
            "sold_out"
        );
        assert_eq!(
            reject_label(&RejectionReason::NotFound(String::new())),
            "not_found"
        );
        assert_eq!(reject_label(&RejectionReason::Conflict), "conflict");
    }
}
