//! # Turnstile Core
//!
//! Domain types and environment traits for the Turnstile ticket-admission
//! engine.
//!
//! This crate holds the vocabulary the engine speaks:
//!
//! - Typed identifiers for events, ticket classes, reservations, purchases
//!   and requesters
//! - [`Money`](money::Money), a minor-unit (cents) currency value that never
//!   touches floating point
//! - The inventory entities: [`TicketClass`](domain::TicketClass),
//!   [`Reservation`](domain::Reservation) and
//!   [`PurchaseRecord`](domain::PurchaseRecord)
//! - The [`RejectionReason`](error::RejectionReason) taxonomy every engine
//!   operation reports failures through
//! - The [`Clock`](environment::Clock) trait so time is injected, never
//!   ambient
//! - The [`PurchaseStore`](store::PurchaseStore) trait the engine persists
//!   confirmed purchases through
//!
//! All types here are owned data, `Clone`-able and serializable; the engine
//! crate layers behavior and concurrency control on top.

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod domain;
pub mod environment;
pub mod error;
pub mod ids;
pub mod money;
pub mod store;

pub use domain::{
    Capacity, PurchaseRecord, PurchaseStatus, Reservation, ReservationState, TicketClass,
    TicketCode,
};
pub use environment::{Clock, SystemClock};
pub use error::{RegistrationError, RejectionReason};
pub use ids::{EventId, IdempotencyKey, PurchaseId, RequesterId, ReservationId, TicketClassId};
pub use money::Money;
pub use store::{PurchaseStore, PurchaseStoreError};
