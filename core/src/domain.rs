//! Inventory entities: ticket classes, reservations and purchase records.
//!
//! These are plain owned data. The counters that make a ticket class "live"
//! (`sold`, `reserved`) belong to the engine's ledger, which is the only
//! place allowed to mutate them; everything here is either immutable after
//! creation or transitions through a small, explicit state machine.

use crate::ids::{EventId, IdempotencyKey, PurchaseId, RequesterId, ReservationId, TicketClassId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Total capacity of a ticket class, fixed at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a new `Capacity`.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One purchasable tier of an event (e.g. "VIP", "General").
///
/// Immutable after registration with the ledger: capacity changes are out of
/// scope, and the unit price at purchase time is copied onto each
/// [`PurchaseRecord`] rather than looked up again later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClass {
    /// Unique ticket class identifier
    pub id: TicketClassId,
    /// Event this class belongs to
    pub event_id: EventId,
    /// Tier name (e.g. "VIP", "General")
    pub name: String,
    /// Price per unit, in minor units
    pub unit_price: Money,
    /// Total sellable units, fixed at creation
    pub total_capacity: Capacity,
}

impl TicketClass {
    /// Creates a new `TicketClass`.
    #[must_use]
    pub const fn new(
        id: TicketClassId,
        event_id: EventId,
        name: String,
        unit_price: Money,
        total_capacity: Capacity,
    ) -> Self {
        Self {
            id,
            event_id,
            name,
            unit_price,
            total_capacity,
        }
    }
}

/// Lifecycle of a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationState {
    /// Active hold counting against availability
    Held,
    /// Hold converted into a confirmed purchase
    Committed,
    /// Hold given back explicitly before expiry
    Released,
    /// Hold timed out and its capacity was returned
    Expired,
}

/// A time-boxed claim on N units of a ticket class.
///
/// Owned by the reservation manager while `Held`; ownership transfers to the
/// purchase record on commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation identifier
    pub id: ReservationId,
    /// Ticket class being held
    pub ticket_class_id: TicketClassId,
    /// Units held (always positive)
    pub quantity: u32,
    /// Who is holding the units
    pub requester: RequesterId,
    /// When the hold was taken
    pub created_at: DateTime<Utc>,
    /// When the hold lapses if not committed or released
    pub expires_at: DateTime<Utc>,
    /// Current lifecycle state
    pub state: ReservationState,
}

impl Reservation {
    /// Creates a new `Held` reservation.
    #[must_use]
    pub const fn held(
        id: ReservationId,
        ticket_class_id: TicketClassId,
        quantity: u32,
        requester: RequesterId,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            ticket_class_id,
            quantity,
            requester,
            created_at,
            expires_at,
            state: ReservationState::Held,
        }
    }

    /// Checks whether the hold has lapsed at the given instant.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Status of a purchase record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseStatus {
    /// Created but not yet settled
    Pending,
    /// Admission committed; the units are sold
    Confirmed,
    /// Admission failed after creation
    Failed,
    /// Confirmed purchase later refunded
    Refunded,
}

/// Scannable code stamped on every confirmed purchase.
///
/// Collision resistance comes from a v4 UUID rather than a pseudo-random
/// string, so two purchases committed in the same millisecond cannot share a
/// code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketCode(String);

impl TicketCode {
    /// Issues a code for a purchase at the given instant.
    #[must_use]
    pub fn issue(purchase_id: PurchaseId, issued_at: DateTime<Utc>) -> Self {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
        Self(format!(
            "ticket_{purchase_id}_{}_{suffix}",
            issued_at.timestamp_millis()
        ))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The durable result of a successful admission.
///
/// Immutable once `Confirmed`, except for the status transition to
/// `Refunded`. The total is computed exactly once from the unit price at
/// purchase time and never recomputed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Unique purchase identifier
    pub id: PurchaseId,
    /// Who made the purchase
    pub requester: RequesterId,
    /// Ticket class purchased
    pub ticket_class_id: TicketClassId,
    /// Units purchased
    pub quantity: u32,
    /// Unit price at the time of purchase
    pub unit_price: Money,
    /// `quantity * unit_price`, fixed at commit time
    pub total_amount: Money,
    /// Key that deduplicates retried submissions
    pub idempotency_key: IdempotencyKey,
    /// Scannable entry code
    pub ticket_code: TicketCode,
    /// Current settlement status
    pub status: PurchaseStatus,
    /// When the admission committed
    pub purchased_at: DateTime<Utc>,
}

impl PurchaseRecord {
    /// Creates a `Confirmed` purchase record.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn confirmed(
        id: PurchaseId,
        requester: RequesterId,
        ticket_class_id: TicketClassId,
        quantity: u32,
        unit_price: Money,
        total_amount: Money,
        idempotency_key: IdempotencyKey,
        ticket_code: TicketCode,
        purchased_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            requester,
            ticket_class_id,
            quantity,
            unit_price,
            total_amount,
            idempotency_key,
            ticket_code,
            status: PurchaseStatus::Confirmed,
            purchased_at,
        }
    }
}
