use tfl_gate::GateError;
use tfl_store::StoreError;
use tfl_types::{InvoiceStatus, TypeError};

/// Stable classification of [`LedgerError`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    InsufficientFunds,
    InvalidState,
    CorruptRecord,
    Store,
    Identity,
    PartialWrite,
    UnknownFunction,
    Config,
}

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} already exists: {key}")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: String,
        balance: String,
        requested: String,
    },

    #[error("invoice {invoice_id} is {actual}, expected {expected}")]
    InvalidState {
        invoice_id: String,
        actual: InvoiceStatus,
        expected: InvoiceStatus,
    },

    #[error("corrupt {kind} record at key {key}: {reason}")]
    CorruptRecord {
        kind: &'static str,
        key: String,
        reason: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("identity error: {0}")]
    Identity(String),

    #[error("write failed ({cause}) and keys {unrestored:?} could not be restored")]
    PartialWrite {
        cause: String,
        unrestored: Vec<String>,
    },

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::CorruptRecord { .. } => ErrorKind::CorruptRecord,
            Self::Store(_) => ErrorKind::Store,
            Self::Identity(_) => ErrorKind::Identity,
            Self::PartialWrite { .. } => ErrorKind::PartialWrite,
            Self::UnknownFunction(_) => ErrorKind::UnknownFunction,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn already_exists(kind: &'static str, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            key: key.into(),
        }
    }
}

impl From<TypeError> for LedgerError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::Corrupt { kind, key, reason } => Self::CorruptRecord { kind, key, reason },
            TypeError::InvalidAmount { .. } | TypeError::UnknownRole(_) => {
                Self::Validation(err.to_string())
            }
            TypeError::InvalidStatus(_) | TypeError::Encode { .. } => {
                Self::CorruptRecord {
                    kind: "record",
                    key: String::new(),
                    reason: err.to_string(),
                }
            }
        }
    }
}

impl From<GateError> for LedgerError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Store(e) => Self::Store(e),
            GateError::Validation(msg) => Self::Validation(msg),
            GateError::Identity(_) | GateError::MissingAttribute(_) => {
                Self::Identity(err.to_string())
            }
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
