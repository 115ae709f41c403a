//! Purchase store trait for durable purchase records.
//!
//! The admission engine treats persistence as an injected dependency: it
//! appends a confirmed [`PurchaseRecord`] through this trait and rolls its
//! counters back if the append fails. The trait is deliberately narrow
//! (append, point lookup, status transition, per-requester listing) because
//! those are the only accesses the engine and its callers need.
//!
//! # Dyn Compatibility
//!
//! Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn` so
//! the trait can be used as a trait object (`Arc<dyn PurchaseStore>`) and
//! injected into the engine at construction time.

use crate::domain::{PurchaseRecord, PurchaseStatus};
use crate::ids::{PurchaseId, RequesterId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during purchase store operations.
#[derive(Error, Debug)]
pub enum PurchaseStoreError {
    /// Purchase not found in the store.
    #[error("purchase not found: {0}")]
    PurchaseNotFound(PurchaseId),

    /// Backend (database, network) error.
    #[error("backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Durable storage for purchase records.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine shares one store across
/// all concurrent submissions.
///
/// # Contract
///
/// The engine calls `append` exactly once per confirmed purchase, after the
/// inventory counters have settled and outside every lock. A failed append
/// is the signal to undo the sale, so implementations must not partially
/// persist: either the record is durably stored or an error comes back.
pub trait PurchaseStore: Send + Sync {
    /// Persist a new purchase record.
    ///
    /// # Errors
    ///
    /// - `Backend`: the write could not be durably applied
    /// - `Serialization`: the record could not be encoded
    fn append(
        &self,
        record: PurchaseRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), PurchaseStoreError>> + Send + '_>>;

    /// Load a purchase record by id.
    ///
    /// Returns `Ok(None)` for an id the store has never seen; errors are
    /// reserved for backend failures.
    ///
    /// # Errors
    ///
    /// - `Backend`: the read failed
    /// - `Serialization`: the stored record could not be decoded
    fn get(
        &self,
        id: PurchaseId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PurchaseRecord>, PurchaseStoreError>> + Send + '_>>;

    /// Transition the status of an existing record, conditionally.
    ///
    /// Applies `from -> to` only if the record's current status is `from`,
    /// atomically with respect to other transitions on the same record.
    /// Returns `Ok(true)` when this caller applied the transition and
    /// `Ok(false)` when the current status differed, which is how the
    /// engine gives concurrent refunds of one purchase a single winner.
    ///
    /// # Errors
    ///
    /// - `PurchaseNotFound`: no record with this id exists
    /// - `Backend`: the write could not be durably applied
    fn transition_status(
        &self,
        id: PurchaseId,
        from: PurchaseStatus,
        to: PurchaseStatus,
    ) -> Pin<Box<dyn Future<Output = Result<bool, PurchaseStoreError>> + Send + '_>>;

    /// List every purchase made by a requester, newest first.
    ///
    /// Returns an empty vector for a requester with no purchases.
    ///
    /// # Errors
    ///
    /// - `Backend`: the read failed
    /// - `Serialization`: a stored record could not be decoded
    fn list_for_requester(
        &self,
        requester: RequesterId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PurchaseRecord>, PurchaseStoreError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_error_display_includes_id() {
        let id = PurchaseId::new();
        let error = PurchaseStoreError::PurchaseNotFound(id);
        assert!(error.to_string().contains(&id.to_string()));
    }

    #[test]
    fn backend_error_display() {
        let error = PurchaseStoreError::Backend("connection reset".to_string());
        assert_eq!(error.to_string(), "backend error: connection reset");
    }
}
