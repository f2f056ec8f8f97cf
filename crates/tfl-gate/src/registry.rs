//! Role registry stored as ordinary ledger records.
//!
//! Each registered principal has one record whose key is the principal name
//! (optionally prefixed) and whose value is the bare role label, e.g.
//! `test_user0 -> supplier`. Roles are read back from the store on every
//! authorization decision; nothing is cached between calls.

use std::sync::Arc;

use tfl_store::{LedgerStore, WriteOp};
use tfl_types::{Principal, Role};
use tracing::debug;

use crate::error::GateError;

pub struct RoleRegistry {
    store: Arc<dyn LedgerStore>,
    prefix: String,
}

impl RoleRegistry {
    pub fn new(store: Arc<dyn LedgerStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// The store key holding `principal`'s role label.
    pub fn key_for(&self, principal: &Principal) -> String {
        format!("{}{}", self.prefix, principal)
    }

    /// Look up the registered role of `principal`.
    ///
    /// Returns `Ok(None)` when nothing is stored for the principal or when the
    /// stored value is not a known role label (for instance an account record
    /// that happens to share the key).
    pub fn role_of(&self, principal: &Principal) -> Result<Option<Role>, GateError> {
        let key = self.key_for(principal);
        let Some(bytes) = self.store.get(&key)? else {
            return Ok(None);
        };
        let role = std::str::from_utf8(&bytes)
            .ok()
            .and_then(|label| label.parse::<Role>().ok());
        if role.is_none() {
            debug!(%principal, key = %key, "stored value is not a role label");
        }
        Ok(role)
    }

    /// Write operations registering every `(principal, role)` pair.
    pub fn registration_ops(&self, participants: &[(Principal, Role)]) -> Vec<WriteOp> {
        participants
            .iter()
            .map(|(principal, role)| {
                WriteOp::put(self.key_for(principal), role.as_str().as_bytes().to_vec())
            })
            .collect()
    }

    /// Register a single principal immediately.
    pub fn register(&self, principal: &Principal, role: Role) -> Result<(), GateError> {
        if principal.is_empty() {
            return Err(GateError::Validation("principal name must not be empty".into()));
        }
        self.store
            .put(&self.key_for(principal), role.as_str().as_bytes())?;
        debug!(%principal, %role, "registered participant");
        Ok(())
    }
}

/// Parse positional `name, role, name, role, ...` arguments.
pub fn parse_participants(args: &[String]) -> Result<Vec<(Principal, Role)>, GateError> {
    if args.len() % 2 != 0 {
        return Err(GateError::Validation(format!(
            "participants must be given as name/role pairs, got {} arguments",
            args.len()
        )));
    }
    args.chunks(2)
        .map(|pair| {
            let name = &pair[0];
            if name.is_empty() {
                return Err(GateError::Validation(
                    "participant name must not be empty".into(),
                ));
            }
            let role = pair[1]
                .parse::<Role>()
                .map_err(|e| GateError::Validation(format!("participant {name}: {e}")))?;
            Ok((Principal::new(name.clone()), role))
        })
        .collect()
}
