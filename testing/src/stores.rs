//! In-memory purchase store for fast, deterministic tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use turnstile_core::{
    PurchaseId, PurchaseRecord, PurchaseStatus, PurchaseStore, PurchaseStoreError, RequesterId,
};

/// `PurchaseStore` backed by a `Vec`, in insertion order.
///
/// Appends can be made to fail on demand with
/// [`InMemoryPurchaseStore::fail_appends`], which is how tests exercise the
/// engine's sale-revert path without a real backend.
#[derive(Debug, Default)]
pub struct InMemoryPurchaseStore {
    records: Mutex<Vec<PurchaseRecord>>,
    failing: AtomicBool,
}

impl InMemoryPurchaseStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `append` fail with a backend error (or stop
    /// failing, with `false`).
    pub fn fail_appends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of every stored record, in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<PurchaseRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PurchaseRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PurchaseStore for InMemoryPurchaseStore {
    fn append(
        &self,
        record: PurchaseRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), PurchaseStoreError>> + Send + '_>> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PurchaseStoreError::Backend(
                    "simulated append failure".to_string(),
                ));
            }
            self.lock().push(record);
            Ok(())
        })
    }

    fn get(
        &self,
        id: PurchaseId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PurchaseRecord>, PurchaseStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            Ok(self
                .lock()
                .iter()
                .find(|record| record.id == id)
                .cloned())
        })
    }

    fn transition_status(
        &self,
        id: PurchaseId,
        from: PurchaseStatus,
        to: PurchaseStatus,
    ) -> Pin<Box<dyn Future<Output = Result<bool, PurchaseStoreError>> + Send + '_>> {
        Box::pin(async move {
            // The vec mutex makes the compare-and-set atomic
            let mut records = self.lock();
            let Some(record) = records.iter_mut().find(|record| record.id == id) else {
                return Err(PurchaseStoreError::PurchaseNotFound(id));
            };
            if record.status != from {
                return Ok(false);
            }
            record.status = to;
            Ok(true)
        })
    }

    fn list_for_requester(
        &self,
        requester: RequesterId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PurchaseRecord>, PurchaseStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            // Insertion order is oldest first; callers get newest first
            Ok(self
                .lock()
                .iter()
                .rev()
                .filter(|record| record.requester == requester)
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use turnstile_core::{IdempotencyKey, Money, TicketClassId, TicketCode};

    fn confirmed(requester: RequesterId) -> PurchaseRecord {
        let id = PurchaseId::new();
        let now = Utc::now();
        PurchaseRecord::confirmed(
            id,
            requester,
            TicketClassId::new(),
            2,
            Money::from_cents(999),
            Money::from_cents(1_998),
            IdempotencyKey::new(format!("key-{id}")),
            TicketCode::issue(id, now),
            now,
        )
    }

    #[tokio::test]
    async fn append_then_get() {
        let store = InMemoryPurchaseStore::new();
        let record = confirmed(RequesterId::new());
        store.append(record.clone()).await.unwrap();
        assert_eq!(store.get(record.id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let store = InMemoryPurchaseStore::new();
        assert_eq!(store.get(PurchaseId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn failing_append_leaves_store_untouched() {
        let store = InMemoryPurchaseStore::new();
        store.fail_appends(true);
        let result = store.append(confirmed(RequesterId::new())).await;
        assert!(matches!(result, Err(PurchaseStoreError::Backend(_))));
        assert!(store.is_empty());

        store.fail_appends(false);
        store.append(confirmed(RequesterId::new())).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn transition_applies_only_from_the_expected_status() {
        let store = InMemoryPurchaseStore::new();
        let record = confirmed(RequesterId::new());
        store.append(record.clone()).await.unwrap();

        let won = store
            .transition_status(record.id, PurchaseStatus::Confirmed, PurchaseStatus::Refunded)
            .await
            .unwrap();
        assert!(won);
        assert_eq!(
            store.get(record.id).await.unwrap().unwrap().status,
            PurchaseStatus::Refunded
        );

        // The record moved on, so the same transition no longer applies
        let won_again = store
            .transition_status(record.id, PurchaseStatus::Confirmed, PurchaseStatus::Refunded)
            .await
            .unwrap();
        assert!(!won_again);
        assert_eq!(
            store.get(record.id).await.unwrap().unwrap().status,
            PurchaseStatus::Refunded
        );

        assert!(matches!(
            store
                .transition_status(
                    PurchaseId::new(),
                    PurchaseStatus::Confirmed,
                    PurchaseStatus::Failed
                )
                .await,
            Err(PurchaseStoreError::PurchaseNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_is_per_requester_newest_first() {
        let store = InMemoryPurchaseStore::new();
        let alice = RequesterId::new();
        let bob = RequesterId::new();

        let first = confirmed(alice);
        let second = confirmed(alice);
        store.append(first.clone()).await.unwrap();
        store.append(confirmed(bob)).await.unwrap();
        store.append(second.clone()).await.unwrap();

        let listed = store.list_for_requester(alice).await.unwrap();
        assert_eq!(listed, vec![second, first]);
    }
}
