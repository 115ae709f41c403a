//! Reservation manager: short-lived holds during checkout.
//!
//! A hold claims capacity through the ledger and lapses after a TTL if it is
//! never committed. Expiry is a lazy sweep on access: there is no timer
//! thread, so the latency between wall-clock expiry and the capacity
//! becoming visible to other callers is at most one `hold`/`available`
//! call. A host that needs tighter latency can call
//! [`ReservationManager::sweep`] from its own scheduler.
//!
//! The manager only keeps live entries. A hold that is released, lapses, or
//! settles into a purchase is removed from the map, so sweep cost and memory
//! stay proportional to the holds currently counting against availability,
//! not to every hold ever taken.

use crate::ledger::InventoryLedger;
use crate::metrics;
use chrono::Duration;
use dashmap::DashMap;
use std::sync::Arc;
use turnstile_core::{
    Clock, RejectionReason, RequesterId, Reservation, ReservationId, ReservationState,
    TicketClassId,
};

/// Owns every live reservation and drives its lifecycle
/// (`Held -> Committed`, with released and lapsed holds pruned).
///
/// All capacity mutation goes through the ledger; the manager's own map is
/// only the book of record for which holds are currently live.
pub struct ReservationManager {
    ledger: Arc<InventoryLedger>,
    holds: DashMap<ReservationId, Reservation>,
    clock: Arc<dyn Clock>,
    max_units_per_hold: u32,
}

impl ReservationManager {
    /// Creates a manager over the given ledger.
    #[must_use]
    pub fn new(ledger: Arc<InventoryLedger>, clock: Arc<dyn Clock>, max_units_per_hold: u32) -> Self {
        Self {
            ledger,
            holds: DashMap::new(),
            clock,
            max_units_per_hold,
        }
    }

    /// Takes a time-boxed hold on `quantity` units of a ticket class.
    ///
    /// Sweeps lapsed holds first, so capacity freed by expiry is
    /// re-acquirable by this very call.
    ///
    /// # Errors
    ///
    /// - [`RejectionReason::InvalidQuantity`] for zero or above the
    ///   per-purchase limit
    /// - [`RejectionReason::NotFound`] for an unknown ticket class
    /// - [`RejectionReason::SoldOut`] (with the remaining quantity) when the
    ///   claim does not fit
    pub fn hold(
        &self,
        ticket_class_id: TicketClassId,
        quantity: u32,
        requester: RequesterId,
        ttl: Duration,
    ) -> Result<Reservation, RejectionReason> {
        self.sweep();

        if quantity == 0 || quantity > self.max_units_per_hold {
            return Err(RejectionReason::InvalidQuantity {
                requested: quantity,
                max: self.max_units_per_hold,
            });
        }

        self.ledger.try_reserve(&ticket_class_id, quantity)?;

        let now = self.clock.now();
        let reservation = Reservation::held(
            ReservationId::new(),
            ticket_class_id,
            quantity,
            requester,
            now,
            now + ttl,
        );
        tracing::debug!(
            reservation = %reservation.id,
            ticket_class = %ticket_class_id,
            quantity,
            expires_at = %reservation.expires_at,
            "hold taken"
        );
        metrics::record_hold_created(quantity);
        self.holds.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    /// Availability for a class, after sweeping lapsed holds.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::NotFound`] for an unknown class.
    pub fn available(&self, ticket_class_id: &TicketClassId) -> Result<u32, RejectionReason> {
        self.sweep();
        self.ledger.available(ticket_class_id)
    }

    /// Gives a hold back before expiry and returns its capacity.
    ///
    /// Idempotent: releasing a reservation that has already been released,
    /// lapsed, settled, or that never existed is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::NotFound`] only when the hold's ticket
    /// class has vanished from the ledger.
    pub fn release(&self, id: &ReservationId) -> Result<(), RejectionReason> {
        // remove_if locks the entry, so exactly one caller takes a Held
        // reservation out and returns its capacity
        let Some((_, reservation)) = self
            .holds
            .remove_if(id, |_, r| r.state == ReservationState::Held)
        else {
            return Ok(());
        };
        self.ledger
            .release(&reservation.ticket_class_id, reservation.quantity)?;
        tracing::debug!(reservation = %id, quantity = reservation.quantity, "hold released");
        metrics::record_hold_released();
        Ok(())
    }

    /// Looks up a live reservation by id.
    ///
    /// Released, lapsed and settled reservations are pruned and come back
    /// `None`.
    #[must_use]
    pub fn get(&self, id: &ReservationId) -> Option<Reservation> {
        self.holds.get(id).map(|entry| entry.clone())
    }

    /// Number of reservations currently tracked.
    #[must_use]
    pub fn active_holds(&self) -> usize {
        self.holds.len()
    }

    /// Removes every lapsed `Held` reservation and returns its capacity,
    /// exactly as an explicit release would. Returns the number of holds
    /// expired.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut expired = 0;
        self.holds.retain(|id, reservation| {
            if reservation.state != ReservationState::Held || !reservation.is_expired(now) {
                return true;
            }
            if let Err(reason) = self
                .ledger
                .release(&reservation.ticket_class_id, reservation.quantity)
            {
                // Unregistered class mid-flight; nothing to give back.
                tracing::warn!(reservation = %id, %reason, "sweep could not release hold");
                return true;
            }
            expired += 1;
            tracing::debug!(reservation = %id, quantity = reservation.quantity, "hold expired");
            metrics::record_hold_expired();
            false
        });
        expired
    }

    /// Converts a hold into a sale: `Held -> Committed`, moving the units
    /// from reserved to sold in the ledger under the class mutex.
    ///
    /// The entry stays in the map until [`ReservationManager::settle`] or
    /// [`ReservationManager::revoke`] finishes the submission.
    ///
    /// Returns the committed reservation.
    pub(crate) fn commit(&self, id: &ReservationId) -> Result<Reservation, RejectionReason> {
        let Some(mut entry) = self.holds.get_mut(id) else {
            // The hold lapsed (or was released) between acquisition and
            // commit; its capacity has already been returned.
            return Err(RejectionReason::NotFound(format!("reservation {id}")));
        };
        if entry.state != ReservationState::Held {
            tracing::error!(reservation = %id, state = ?entry.state, "commit on a non-held reservation");
            return Err(RejectionReason::InternalInventoryError);
        }
        self.ledger
            .commit_sale(&entry.ticket_class_id, entry.quantity)?;
        entry.state = ReservationState::Committed;
        Ok(entry.clone())
    }

    /// Drops a committed reservation whose submission settled; the sale
    /// stands and the entry is no longer needed.
    pub(crate) fn settle(&self, id: &ReservationId) {
        self.holds.remove(id);
    }

    /// Undoes a commit after a failed durable write: the sold units return
    /// to the pool and the entry is pruned.
    pub(crate) fn revoke(&self, id: &ReservationId) {
        let Some((_, reservation)) = self
            .holds
            .remove_if(id, |_, r| r.state == ReservationState::Committed)
        else {
            return;
        };
        if let Err(reason) = self
            .ledger
            .revert_sale(&reservation.ticket_class_id, reservation.quantity)
        {
            tracing::warn!(reservation = %id, %reason, "revoke could not revert sale");
            return;
        }
        tracing::warn!(reservation = %id, quantity = reservation.quantity, "committed hold revoked");
        metrics::record_hold_released();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use turnstile_core::{Capacity, EventId, Money, SystemClock, TicketClass};
    use turnstile_testing::mocks::ManualClock;

    fn setup(capacity: u32) -> (Arc<InventoryLedger>, TicketClassId) {
        let ledger = Arc::new(InventoryLedger::new());
        let class = TicketClass::new(
            TicketClassId::new(),
            EventId::new(),
            "General".to_string(),
            Money::from_cents(999),
            Capacity::new(capacity),
        );
        let id = class.id;
        ledger.register(class).unwrap();
        (ledger, id)
    }

    #[test]
    fn hold_reserves_capacity() {
        let (ledger, class_id) = setup(10);
        let manager =
            ReservationManager::new(Arc::clone(&ledger), Arc::new(SystemClock), 8);

        let reservation = manager
            .hold(class_id, 2, RequesterId::new(), Duration::minutes(10))
            .unwrap();

        assert_eq!(reservation.state, ReservationState::Held);
        assert_eq!(manager.available(&class_id).unwrap(), 8);
    }

    #[test]
    fn hold_beyond_availability_reports_remaining() {
        let (ledger, class_id) = setup(3);
        let manager =
            ReservationManager::new(Arc::clone(&ledger), Arc::new(SystemClock), 8);

        manager
            .hold(class_id, 2, RequesterId::new(), Duration::minutes(10))
            .unwrap();
        let rejection = manager
            .hold(class_id, 2, RequesterId::new(), Duration::minutes(10))
            .unwrap_err();

        assert_eq!(rejection, RejectionReason::SoldOut { available: 1 });
    }

    #[test]
    fn quantity_limits_enforced() {
        let (ledger, class_id) = setup(100);
        let manager =
            ReservationManager::new(Arc::clone(&ledger), Arc::new(SystemClock), 8);

        assert_eq!(
            manager.hold(class_id, 0, RequesterId::new(), Duration::minutes(10)),
            Err(RejectionReason::InvalidQuantity {
                requested: 0,
                max: 8
            })
        );
        assert_eq!(
            manager.hold(class_id, 9, RequesterId::new(), Duration::minutes(10)),
            Err(RejectionReason::InvalidQuantity {
                requested: 9,
                max: 8
            })
        );
        // Nothing was reserved by the rejected attempts
        assert_eq!(manager.available(&class_id).unwrap(), 100);
    }

    #[test]
    fn release_is_idempotent_and_prunes() {
        let (ledger, class_id) = setup(5);
        let manager =
            ReservationManager::new(Arc::clone(&ledger), Arc::new(SystemClock), 8);

        let reservation = manager
            .hold(class_id, 3, RequesterId::new(), Duration::minutes(10))
            .unwrap();

        manager.release(&reservation.id).unwrap();
        assert_eq!(manager.available(&class_id).unwrap(), 5);
        assert_eq!(manager.get(&reservation.id), None);

        // Second release is a no-op, not an error, and frees nothing twice
        manager.release(&reservation.id).unwrap();
        assert_eq!(manager.available(&class_id).unwrap(), 5);
    }

    #[test]
    fn releasing_unknown_reservation_is_a_no_op() {
        let (ledger, class_id) = setup(5);
        let manager =
            ReservationManager::new(Arc::clone(&ledger), Arc::new(SystemClock), 8);

        manager.release(&ReservationId::new()).unwrap();
        assert_eq!(manager.available(&class_id).unwrap(), 5);
    }

    #[test]
    fn expired_hold_returns_capacity_without_explicit_release() {
        let (ledger, class_id) = setup(1);
        let clock = Arc::new(ManualClock::default());
        let manager = ReservationManager::new(Arc::clone(&ledger), clock.clone(), 8);

        let reservation = manager
            .hold(class_id, 1, RequesterId::new(), Duration::seconds(1))
            .unwrap();
        assert_eq!(manager.available(&class_id).unwrap(), 0);

        clock.advance(Duration::seconds(2));

        // The sweep runs lazily on the next access and prunes the entry
        assert_eq!(manager.available(&class_id).unwrap(), 1);
        assert_eq!(manager.get(&reservation.id), None);

        // And the freed capacity is re-acquirable
        manager
            .hold(class_id, 1, RequesterId::new(), Duration::minutes(10))
            .unwrap();
    }

    #[test]
    fn committed_hold_does_not_expire() {
        let (ledger, class_id) = setup(2);
        let clock = Arc::new(ManualClock::default());
        let manager = ReservationManager::new(Arc::clone(&ledger), clock.clone(), 8);

        let reservation = manager
            .hold(class_id, 2, RequesterId::new(), Duration::seconds(1))
            .unwrap();
        manager.commit(&reservation.id).unwrap();

        clock.advance(Duration::minutes(5));
        assert_eq!(manager.sweep(), 0);
        assert_eq!(manager.active_holds(), 1);

        let counts = ledger.counts(&class_id).unwrap();
        assert_eq!(counts.sold, 2);
        assert_eq!(counts.reserved, 0);
    }

    #[test]
    fn commit_on_lapsed_hold_fails_without_selling() {
        let (ledger, class_id) = setup(1);
        let clock = Arc::new(ManualClock::default());
        let manager = ReservationManager::new(Arc::clone(&ledger), clock.clone(), 8);

        let reservation = manager
            .hold(class_id, 1, RequesterId::new(), Duration::seconds(1))
            .unwrap();
        clock.advance(Duration::seconds(5));
        manager.sweep();

        assert!(matches!(
            manager.commit(&reservation.id),
            Err(RejectionReason::NotFound(_))
        ));
        // The expiry already gave the capacity back; nothing was sold
        assert_eq!(ledger.counts(&class_id).unwrap().sold, 0);
    }

    #[test]
    fn revoke_returns_sold_units_and_prunes() {
        let (ledger, class_id) = setup(4);
        let manager =
            ReservationManager::new(Arc::clone(&ledger), Arc::new(SystemClock), 8);

        let reservation = manager
            .hold(class_id, 4, RequesterId::new(), Duration::minutes(10))
            .unwrap();
        manager.commit(&reservation.id).unwrap();
        assert_eq!(ledger.counts(&class_id).unwrap().sold, 4);

        manager.revoke(&reservation.id);

        let counts = ledger.counts(&class_id).unwrap();
        assert_eq!(counts.sold, 0);
        assert_eq!(counts.available(), 4);
        assert_eq!(manager.get(&reservation.id), None);
    }

    #[test]
    fn terminal_holds_do_not_accumulate() {
        let (ledger, class_id) = setup(10);
        let clock = Arc::new(ManualClock::default());
        let manager = ReservationManager::new(Arc::clone(&ledger), clock.clone(), 8);

        let released = manager
            .hold(class_id, 1, RequesterId::new(), Duration::minutes(10))
            .unwrap();
        manager
            .hold(class_id, 2, RequesterId::new(), Duration::minutes(10))
            .unwrap();
        let settled = manager
            .hold(class_id, 3, RequesterId::new(), Duration::minutes(10))
            .unwrap();

        manager.release(&released.id).unwrap();
        manager.commit(&settled.id).unwrap();
        manager.settle(&settled.id);
        clock.advance(Duration::minutes(11));
        manager.sweep();

        // Every terminal hold was pruned, and the books balance
        assert_eq!(manager.active_holds(), 0);
        let counts = ledger.counts(&class_id).unwrap();
        assert_eq!(counts.sold, 3);
        assert_eq!(counts.reserved, 0);
        assert_eq!(counts.available(), 7);
    }
}
