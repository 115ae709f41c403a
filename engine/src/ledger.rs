//! Inventory ledger: per-class capacity accounting.
//!
//! Tracks total/sold/reserved counts for every registered ticket class and
//! is the single authority for the invariant `sold + reserved <= total`.
//! Class metadata (price, capacity) is immutable after registration; the two
//! counters mutate only under that class's mutex, so a check-then-increment
//! is atomic and the "last ticket" race has exactly one winner.
//!
//! Callers are expected to reach the ledger through the reservation manager
//! and admission controller; the raw counter operations stay narrow on
//! purpose.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, Mutex, PoisonError};
use turnstile_core::{RegistrationError, RejectionReason, TicketClass, TicketClassId};

/// Snapshot of one class's counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassCounts {
    /// Total sellable units, fixed at registration
    pub total: u32,
    /// Units committed to confirmed purchases
    pub sold: u32,
    /// Units under active holds
    pub reserved: u32,
}

impl ClassCounts {
    /// Units neither sold nor held: `total - sold - reserved`.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.total - self.sold - self.reserved
    }
}

#[derive(Debug)]
struct Counters {
    sold: u32,
    reserved: u32,
}

#[derive(Debug)]
struct ClassSlot {
    class: TicketClass,
    counters: Mutex<Counters>,
}

impl ClassSlot {
    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        // A poisoned counter mutex means a panic mid-mutation elsewhere;
        // the counters themselves are always in a consistent state because
        // every critical section is a couple of integer writes.
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry and counter store for all ticket classes.
///
/// Every mutation is serialized per ticket class by that class's mutex;
/// operations on distinct classes proceed in parallel. No operation does
/// I/O while holding a lock.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    classes: DashMap<TicketClassId, Arc<ClassSlot>>,
}

impl InventoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: DashMap::new(),
        }
    }

    /// Registers a ticket class. Capacity is immutable afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::AlreadyRegistered`] for a duplicate id
    /// and [`RegistrationError::ZeroCapacity`] for an unsellable class.
    pub fn register(&self, class: TicketClass) -> Result<(), RegistrationError> {
        if class.total_capacity.value() == 0 {
            return Err(RegistrationError::ZeroCapacity(class.id));
        }

        match self.classes.entry(class.id) {
            Entry::Occupied(_) => Err(RegistrationError::AlreadyRegistered(class.id)),
            Entry::Vacant(vacant) => {
                tracing::debug!(
                    ticket_class = %class.id,
                    capacity = class.total_capacity.value(),
                    price_cents = class.unit_price.cents(),
                    "ticket class registered"
                );
                vacant.insert(Arc::new(ClassSlot {
                    class,
                    counters: Mutex::new(Counters {
                        sold: 0,
                        reserved: 0,
                    }),
                }));
                Ok(())
            }
        }
    }

    /// Returns the immutable metadata for a class, if registered.
    #[must_use]
    pub fn class(&self, id: &TicketClassId) -> Option<TicketClass> {
        self.classes.get(id).map(|slot| slot.class.clone())
    }

    /// Returns a counter snapshot for a class.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::NotFound`] for an unknown class.
    pub fn counts(&self, id: &TicketClassId) -> Result<ClassCounts, RejectionReason> {
        let slot = self.slot(id)?;
        let counters = slot.lock();
        Ok(ClassCounts {
            total: slot.class.total_capacity.value(),
            sold: counters.sold,
            reserved: counters.reserved,
        })
    }

    /// Returns `total - sold - reserved` for a class.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::NotFound`] for an unknown class.
    pub fn available(&self, id: &TicketClassId) -> Result<u32, RejectionReason> {
        Ok(self.counts(id)?.available())
    }

    /// Atomically claims `quantity` units as reserved.
    ///
    /// The availability check and the increment happen under the class
    /// mutex, so concurrent claims on the same class admit at most the
    /// remaining capacity.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::NotFound`] for an unknown class and
    /// [`RejectionReason::SoldOut`] (with the remaining quantity) when the
    /// claim does not fit.
    pub fn try_reserve(&self, id: &TicketClassId, quantity: u32) -> Result<(), RejectionReason> {
        let slot = self.slot(id)?;
        let mut counters = slot.lock();
        let available = slot.class.total_capacity.value() - counters.sold - counters.reserved;
        if quantity > available {
            return Err(RejectionReason::SoldOut { available });
        }
        counters.reserved += quantity;
        Ok(())
    }

    /// Atomically moves `quantity` units from reserved to sold.
    ///
    /// Must only be called while a matching reservation is held; the
    /// defensive check should be unreachable when callers respect that.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::NotFound`] for an unknown class and
    /// [`RejectionReason::InternalInventoryError`] if the move would break
    /// `sold + reserved <= total`.
    pub fn commit_sale(&self, id: &TicketClassId, quantity: u32) -> Result<(), RejectionReason> {
        let slot = self.slot(id)?;
        let mut counters = slot.lock();
        if counters.reserved < quantity
            || counters.sold + quantity > slot.class.total_capacity.value()
        {
            tracing::error!(
                ticket_class = %id,
                quantity,
                sold = counters.sold,
                reserved = counters.reserved,
                "commit_sale without a matching reservation"
            );
            return Err(RejectionReason::InternalInventoryError);
        }
        counters.reserved -= quantity;
        counters.sold += quantity;
        Ok(())
    }

    /// Returns `quantity` reserved units to the available pool.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::NotFound`] for an unknown class.
    pub fn release(&self, id: &TicketClassId, quantity: u32) -> Result<(), RejectionReason> {
        let slot = self.slot(id)?;
        let mut counters = slot.lock();
        counters.reserved = counters.reserved.saturating_sub(quantity);
        Ok(())
    }

    /// Returns `quantity` sold units to the available pool.
    ///
    /// Used when a durable write fails after commit, and for refunds.
    pub(crate) fn revert_sale(
        &self,
        id: &TicketClassId,
        quantity: u32,
    ) -> Result<(), RejectionReason> {
        let slot = self.slot(id)?;
        let mut counters = slot.lock();
        counters.sold = counters.sold.saturating_sub(quantity);
        Ok(())
    }

    fn slot(&self, id: &TicketClassId) -> Result<Arc<ClassSlot>, RejectionReason> {
        self.classes
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RejectionReason::NotFound(format!("ticket class {id}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use turnstile_core::{Capacity, EventId, Money};

    fn general(capacity: u32) -> TicketClass {
        TicketClass::new(
            TicketClassId::new(),
            EventId::new(),
            "General".to_string(),
            Money::from_cents(2_500),
            Capacity::new(capacity),
        )
    }

    #[test]
    fn register_then_read_back() {
        let ledger = InventoryLedger::new();
        let class = general(100);
        let id = class.id;

        ledger.register(class).unwrap();
        assert_eq!(ledger.available(&id).unwrap(), 100);
        assert_eq!(ledger.class(&id).unwrap().name, "General");
    }

    #[test]
    fn duplicate_registration_rejected() {
        let ledger = InventoryLedger::new();
        let class = general(10);
        ledger.register(class.clone()).unwrap();
        assert_eq!(
            ledger.register(class.clone()),
            Err(RegistrationError::AlreadyRegistered(class.id))
        );
    }

    #[test]
    fn zero_capacity_rejected() {
        let ledger = InventoryLedger::new();
        let class = general(0);
        let id = class.id;
        assert_eq!(
            ledger.register(class),
            Err(RegistrationError::ZeroCapacity(id))
        );
    }

    #[test]
    fn unknown_class_is_not_found() {
        let ledger = InventoryLedger::new();
        let missing = TicketClassId::new();
        assert!(matches!(
            ledger.available(&missing),
            Err(RejectionReason::NotFound(_))
        ));
    }

    #[test]
    fn reserve_counts_against_availability() {
        let ledger = InventoryLedger::new();
        let class = general(10);
        let id = class.id;
        ledger.register(class).unwrap();

        ledger.try_reserve(&id, 4).unwrap();
        assert_eq!(ledger.available(&id).unwrap(), 6);

        // CRITICAL: reserved units count, not just sold ones
        assert_eq!(
            ledger.try_reserve(&id, 7),
            Err(RejectionReason::SoldOut { available: 6 })
        );
    }

    #[test]
    fn commit_moves_reserved_to_sold() {
        let ledger = InventoryLedger::new();
        let class = general(10);
        let id = class.id;
        ledger.register(class).unwrap();

        ledger.try_reserve(&id, 3).unwrap();
        ledger.commit_sale(&id, 3).unwrap();

        let counts = ledger.counts(&id).unwrap();
        assert_eq!(counts.sold, 3);
        assert_eq!(counts.reserved, 0);
        assert_eq!(counts.available(), 7);
    }

    #[test]
    fn commit_without_reservation_is_defended() {
        let ledger = InventoryLedger::new();
        let class = general(10);
        let id = class.id;
        ledger.register(class).unwrap();

        assert_eq!(
            ledger.commit_sale(&id, 1),
            Err(RejectionReason::InternalInventoryError)
        );
        // Nothing moved
        assert_eq!(ledger.counts(&id).unwrap().sold, 0);
    }

    #[test]
    fn release_returns_capacity() {
        let ledger = InventoryLedger::new();
        let class = general(5);
        let id = class.id;
        ledger.register(class).unwrap();

        ledger.try_reserve(&id, 5).unwrap();
        assert_eq!(ledger.available(&id).unwrap(), 0);
        ledger.release(&id, 5).unwrap();
        assert_eq!(ledger.available(&id).unwrap(), 5);
    }

    #[test]
    fn invariant_holds_across_full_cycle() {
        let ledger = InventoryLedger::new();
        let class = general(8);
        let id = class.id;
        ledger.register(class).unwrap();

        ledger.try_reserve(&id, 5).unwrap();
        ledger.commit_sale(&id, 2).unwrap();
        ledger.release(&id, 3).unwrap();

        let counts = ledger.counts(&id).unwrap();
        assert!(counts.sold + counts.reserved <= counts.total);
        assert_eq!(counts.sold, 2);
        assert_eq!(counts.reserved, 0);
        assert_eq!(counts.available(), 6);
    }
}
