//! Error taxonomy for the admission engine.
//!
//! Every failure crosses the engine boundary as a typed value so the
//! presentation layer can pattern-match and render specific messaging.
//! Nothing in the engine throws; nothing is silently swallowed.

use crate::ids::TicketClassId;
use thiserror::Error;

/// Why a purchase request (or one of its constituent operations) was
/// rejected.
///
/// `SoldOut` and `InvalidQuantity` are expected, user-recoverable outcomes.
/// `NotFound` and `Conflict` indicate caller bugs. `InternalInventoryError`
/// should be unreachable when callers respect reservations; it is logged at
/// high severity and the caller may resubmit with the same idempotency key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// Unknown ticket class, reservation or purchase.
    #[error("not found: {0}")]
    NotFound(String),

    /// Capacity exhausted. Carries the remaining quantity so the caller can
    /// offer a partial purchase.
    #[error("sold out: {available} remaining")]
    SoldOut {
        /// Units still available at the time of rejection.
        available: u32,
    },

    /// Quantity of zero, or above the per-purchase limit.
    #[error("invalid quantity {requested} (must be 1..={max})")]
    InvalidQuantity {
        /// The quantity the caller asked for.
        requested: u32,
        /// The configured per-purchase maximum.
        max: u32,
    },

    /// Idempotency key already bound to a different purchase. Detects a
    /// caller key-generation bug, not a normal race.
    #[error("idempotency key already bound to a different purchase")]
    Conflict,

    /// Post-reservation accounting or persistence failure. Retryable with
    /// the same idempotency key; no capacity is leaked.
    #[error("inventory accounting failed after reservation")]
    InternalInventoryError,
}

/// Failures registering a ticket class with the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A class with this id is already registered.
    #[error("ticket class {0} already registered")]
    AlreadyRegistered(TicketClassId),

    /// Capacity must be greater than zero.
    #[error("ticket class {0} has zero capacity")]
    ZeroCapacity(TicketClassId),
}
