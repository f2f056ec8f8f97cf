use thiserror::Error;

/// Errors produced while parsing or encoding ledger types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid amount {value:?}: {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("unknown role: {0:?}")]
    UnknownRole(String),

    #[error("invalid invoice status: {0}")]
    InvalidStatus(u64),

    #[error("failed to encode {kind} record: {reason}")]
    Encode { kind: &'static str, reason: String },

    #[error("corrupt {kind} record at key {key:?}: {reason}")]
    Corrupt {
        kind: &'static str,
        key: String,
        reason: String,
    },
}
