use crate::error::{StoreError, StoreResult};

/// One staged mutation against the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

impl WriteOp {
    pub fn put(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::Put {
            key: key.into(),
            value,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// The key this operation touches.
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Single-key ledger store.
///
/// Keys are opaque strings and values are opaque bytes. The store never
/// interprets values.
///
/// Implementations must satisfy these invariants:
/// - `get` after a successful `put` on the same key returns the put value.
/// - `delete` of an absent key succeeds.
/// - All backend errors are propagated, never silently ignored.
pub trait LedgerStore: Send + Sync {
    /// Read the value at `key`. Returns `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Create or overwrite the value at `key`.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// List every key starting with `prefix`, in ascending order.
    ///
    /// Backends that cannot enumerate keys return
    /// [`StoreError::Unsupported`]; callers must degrade accordingly.
    fn keys(&self, _prefix: &str) -> StoreResult<Vec<String>> {
        Err(StoreError::Unsupported("key enumeration"))
    }

    /// Apply a set of writes.
    ///
    /// The default implementation applies each operation in order and stops
    /// at the first failure, leaving earlier writes in place. Backends that
    /// can commit the whole batch all-or-nothing override this and return
    /// `true` from [`atomic_batches`](Self::atomic_batches).
    fn apply_batch(&self, ops: &[WriteOp]) -> StoreResult<()> {
        for op in ops {
            match op {
                WriteOp::Put { key, value } => self.put(key, value)?,
                WriteOp::Delete { key } => self.delete(key)?,
            }
        }
        Ok(())
    }

    /// Whether [`apply_batch`](Self::apply_batch) is all-or-nothing.
    fn atomic_batches(&self) -> bool {
        false
    }
}
