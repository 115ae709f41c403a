//! Idempotency guard: one key, one purchase, forever.
//!
//! A client that times out and retries must get the original purchase back,
//! not a second one. The guard maps each idempotency key to the purchase it
//! produced. Bindings never expire: a retry arriving hours later still
//! replays, and keys are cheap enough (one map entry) that eviction is not
//! worth the correctness risk.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use turnstile_core::{IdempotencyKey, PurchaseId, RejectionReason};

/// Bind-once map from idempotency key to purchase id.
///
/// `bind` uses the map's entry API, so two concurrent submissions with the
/// same fresh key race to a single winner; the loser observes the winner's
/// binding on its pre-flight lookup or fails its own bind with `Conflict`.
#[derive(Debug, Default)]
pub struct IdempotencyGuard {
    bindings: DashMap<IdempotencyKey, PurchaseId>,
}

impl IdempotencyGuard {
    /// Creates an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: DashMap::new(),
        }
    }

    /// Returns the purchase a key is bound to, if any.
    #[must_use]
    pub fn lookup(&self, key: &IdempotencyKey) -> Option<PurchaseId> {
        self.bindings.get(key).map(|entry| *entry.value())
    }

    /// Binds a key to a purchase, exactly once.
    ///
    /// Re-binding a key to the purchase it is already bound to is a no-op,
    /// so the call is safe to retry.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::Conflict`] if the key is already bound to
    /// a different purchase.
    pub fn bind(&self, key: IdempotencyKey, purchase_id: PurchaseId) -> Result<(), RejectionReason> {
        match self.bindings.entry(key) {
            Entry::Occupied(occupied) if *occupied.get() != purchase_id => {
                tracing::warn!(
                    existing = %occupied.get(),
                    attempted = %purchase_id,
                    "idempotency key already bound to a different purchase"
                );
                Err(RejectionReason::Conflict)
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(vacant) => {
                vacant.insert(purchase_id);
                Ok(())
            }
        }
    }

    /// Number of bound keys. Mostly useful for diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no key has been bound yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lookup_before_bind_is_none() {
        let guard = IdempotencyGuard::new();
        assert_eq!(guard.lookup(&IdempotencyKey::new("k1")), None);
    }

    #[test]
    fn bind_then_lookup() {
        let guard = IdempotencyGuard::new();
        let id = PurchaseId::new();
        guard.bind(IdempotencyKey::new("k1"), id).unwrap();
        assert_eq!(guard.lookup(&IdempotencyKey::new("k1")), Some(id));
    }

    #[test]
    fn rebinding_same_purchase_is_a_no_op() {
        let guard = IdempotencyGuard::new();
        let id = PurchaseId::new();
        guard.bind(IdempotencyKey::new("k1"), id).unwrap();
        guard.bind(IdempotencyKey::new("k1"), id).unwrap();
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn rebinding_different_purchase_conflicts() {
        let guard = IdempotencyGuard::new();
        guard
            .bind(IdempotencyKey::new("k1"), PurchaseId::new())
            .unwrap();
        assert_eq!(
            guard.bind(IdempotencyKey::new("k1"), PurchaseId::new()),
            Err(RejectionReason::Conflict)
        );
    }

    #[test]
    fn distinct_keys_are_independent() {
        let guard = IdempotencyGuard::new();
        let a = PurchaseId::new();
        let b = PurchaseId::new();
        guard.bind(IdempotencyKey::new("k1"), a).unwrap();
        guard.bind(IdempotencyKey::new("k2"), b).unwrap();
        assert_eq!(guard.lookup(&IdempotencyKey::new("k1")), Some(a));
        assert_eq!(guard.lookup(&IdempotencyKey::new("k2")), Some(b));
    }
}
