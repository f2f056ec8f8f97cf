/// Errors from ledger store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("backend error on key {key:?}: {reason}")]
    Backend { key: String, reason: String },

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted store image could not be read or written.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend does not offer this capability.
    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn backend(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
