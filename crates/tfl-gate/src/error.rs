use tfl_store::StoreError;

/// Errors that can occur while resolving identities and roles.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The identity provider could not resolve the current caller.
    #[error("identity unavailable: {0}")]
    Identity(String),

    /// The requested identity attribute is not present.
    #[error("identity attribute not found: {0}")]
    MissingAttribute(String),

    /// A role registration request was malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The role registry could not be read or written.
    #[error("role registry store error: {0}")]
    Store(#[from] StoreError),
}
