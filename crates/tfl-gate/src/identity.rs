use std::collections::BTreeMap;

use tfl_types::Principal;

use crate::error::GateError;

/// Attribute under which identity providers expose the caller's user name.
pub const USERNAME_ATTRIBUTE: &str = "username";

/// Resolves the caller of the current invocation.
///
/// Certificate verification and attribute issuance happen outside TFL; this
/// trait is the boundary the ledger calls into.
pub trait IdentityProvider: Send + Sync {
    /// The authenticated principal behind the current invocation.
    fn current_principal(&self) -> Result<Principal, GateError>;

    /// A named attribute of the current caller's credential.
    fn attribute(&self, name: &str) -> Result<String, GateError>;
}

/// A fixed identity, for embedding, the CLI, and tests.
#[derive(Clone, Debug)]
pub struct StaticIdentity {
    principal: Principal,
    attributes: BTreeMap<String, String>,
}

impl StaticIdentity {
    /// An identity whose `username` attribute is the principal name.
    pub fn new(principal: impl Into<Principal>) -> Self {
        let principal = principal.into();
        let mut attributes = BTreeMap::new();
        attributes.insert(USERNAME_ATTRIBUTE.to_string(), principal.to_string());
        Self {
            principal,
            attributes,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_principal(&self) -> Result<Principal, GateError> {
        if self.principal.is_empty() {
            return Err(GateError::Identity("empty principal".into()));
        }
        Ok(self.principal.clone())
    }

    fn attribute(&self, name: &str) -> Result<String, GateError> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| GateError::MissingAttribute(name.to_string()))
    }
}
