//! Fault-injecting store wrapper.
//!
//! [`FaultyStore`] forwards to an inner store but can be armed to fail writes
//! to specific keys, or every write after a given number of successes. Its
//! batches are never atomic: they are applied one write at a time through the
//! fault checks, which reproduces the partial-failure window of a host ledger
//! without a transaction boundary.

use std::collections::BTreeSet;
use std::sync::Mutex;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

#[derive(Debug, Default)]
struct FaultPlan {
    failing_keys: BTreeSet<String>,
    writes_before_failure: Option<usize>,
    writes_seen: usize,
}

/// A [`LedgerStore`] that fails on demand.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    plan: Mutex<FaultPlan>,
}

impl<S: LedgerStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            plan: Mutex::new(FaultPlan::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail every subsequent put or delete of `key`.
    pub fn fail_writes_to(&self, key: impl Into<String>) {
        if let Ok(mut plan) = self.plan.lock() {
            plan.failing_keys.insert(key.into());
        }
    }

    /// Allow `n` more writes to succeed, then fail every write after them.
    pub fn fail_after_writes(&self, n: usize) {
        if let Ok(mut plan) = self.plan.lock() {
            plan.writes_before_failure = Some(n);
            plan.writes_seen = 0;
        }
    }

    /// Disarm every fault.
    pub fn heal(&self) {
        if let Ok(mut plan) = self.plan.lock() {
            *plan = FaultPlan::default();
        }
    }

    fn check(&self, key: &str) -> StoreResult<()> {
        let mut plan = self.plan.lock().map_err(|_| StoreError::LockPoisoned)?;
        if plan.failing_keys.contains(key) {
            debug!(key, "injected write fault");
            return Err(StoreError::backend(key, "injected fault"));
        }
        if let Some(limit) = plan.writes_before_failure {
            if plan.writes_seen >= limit {
                debug!(key, limit, "injected write fault after limit");
                return Err(StoreError::backend(key, "injected fault"));
            }
        }
        plan.writes_seen += 1;
        Ok(())
    }
}

impl<S: LedgerStore> LedgerStore for FaultyStore<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.check(key)?;
        self.inner.put(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.check(key)?;
        self.inner.delete(key)
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.keys(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLedgerStore;
    use crate::traits::WriteOp;

    #[test]
    fn failing_key_rejects_put_and_delete() {
        let store = FaultyStore::new(InMemoryLedgerStore::new());
        store.fail_writes_to("bad");
        assert!(store.put("bad", b"x").is_err());
        assert!(store.delete("bad").is_err());
        store.put("good", b"x").unwrap();

        store.heal();
        store.put("bad", b"x").unwrap();
    }

    #[test]
    fn batch_is_partially_applied() {
        let store = FaultyStore::new(InMemoryLedgerStore::new());
        store.fail_after_writes(1);
        let err = store
            .apply_batch(&[WriteOp::put("a", b"1".to_vec()), WriteOp::put("b", b"2".to_vec())])
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend { ref key, .. } if key == "b"));
        assert!(store.get("a").unwrap().is_some());
        assert!(store.get("b").unwrap().is_none());
        assert!(!store.atomic_batches());
    }
}
