//! # Turnstile Engine
//!
//! Ticket inventory accounting and purchase admission.
//!
//! This crate is the logic that should sit between a client's "buy ticket"
//! action and the durable store, the part of the domain with real
//! invariants:
//!
//! - **No overselling**: for every ticket class, `sold + reserved <= total`
//!   at all times, enforced by the [`ledger::InventoryLedger`].
//! - **Consistent totals**: `total = unit_price * quantity` in minor-unit
//!   integer arithmetic, computed exactly once at commit.
//! - **Idempotent retries**: a resubmitted purchase with the same key
//!   returns the original record, via the
//!   [`idempotency::IdempotencyGuard`].
//! - **Bounded holds**: checkout claims capacity through the
//!   [`reservation::ReservationManager`] and lapses after a TTL if never
//!   committed.
//!
//! The [`admission::AdmissionController`] ties the four components together:
//! a request is held, priced, committed and persisted, or every increment
//! it made is undone and a typed [`RejectionReason`] comes back.
//!
//! ## Concurrency
//!
//! The engine is safe under many concurrent callers. Mutual exclusion is
//! per ticket class (a mutex over that class's counters) and per idempotency
//! key (one map entry); contention on distinct classes or keys never
//! serializes. No I/O happens inside a critical section: the durable write
//! of a [`PurchaseRecord`](turnstile_core::PurchaseRecord) runs after the
//! counters settle, outside every lock.
//!
//! [`RejectionReason`]: turnstile_core::RejectionReason

pub mod admission;
pub mod config;
pub mod idempotency;
pub mod ledger;
pub mod metrics;
pub mod reservation;

pub use admission::{AdmissionController, PurchaseRequest};
pub use config::EngineConfig;
pub use idempotency::IdempotencyGuard;
pub use ledger::{ClassCounts, InventoryLedger};
pub use reservation::ReservationManager;
pub use turnstile_core::{PurchaseStore, PurchaseStoreError};
