//! # Turnstile Testing
//!
//! Testing utilities for the Turnstile admission engine.
//!
//! This crate provides:
//! - Deterministic clocks ([`mocks::FixedClock`], [`mocks::ManualClock`])
//! - An in-memory [`stores::InMemoryPurchaseStore`] with an injectable
//!   failure mode, for exercising the engine's rollback paths
//! - Builders for common test fixtures
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use turnstile_engine::{AdmissionController, EngineConfig, PurchaseRequest};
//! use turnstile_testing::{builders, mocks::ManualClock, stores::InMemoryPurchaseStore};
//!
//! #[tokio::test]
//! async fn test_purchase_flow() {
//!     let store = Arc::new(InMemoryPurchaseStore::new());
//!     let clock = Arc::new(ManualClock::default());
//!     let controller = AdmissionController::new(store, clock, EngineConfig::default());
//!
//!     let class = builders::ticket_class("General", 9_99, 100);
//!     controller.register_class(class.clone()).unwrap();
//!     // ...
//! }
//! ```

pub mod mocks;
pub mod stores;

/// Builders for common test fixtures.
pub mod builders {
    use turnstile_core::{Capacity, EventId, Money, TicketClass, TicketClassId};

    /// A ticket class with fresh ids, the given name, a price in cents and
    /// a total capacity.
    #[must_use]
    pub fn ticket_class(name: &str, price_cents: u64, capacity: u32) -> TicketClass {
        TicketClass::new(
            TicketClassId::new(),
            EventId::new(),
            name.to_string(),
            Money::from_cents(price_cents),
            Capacity::new(capacity),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use stores::InMemoryPurchaseStore;
