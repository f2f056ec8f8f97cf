//! Identity, roles, and authorization for the Trade Finance Ledger.
//!
//! Every invoice operation is gated here before anything is written:
//!
//! 1. The caller's principal comes from an [`IdentityProvider`] (or from the
//!    operation's arguments, depending on ledger configuration).
//! 2. The caller's role is re-read from the [`RoleRegistry`] on every call.
//! 3. The [`AuthorizationPolicy`] decides `(principal, role, action, resource)`
//!    -> [`Decision`], independently of storage.

pub mod config;
pub mod error;
pub mod identity;
pub mod policy;
pub mod registry;

pub use config::{GateConfig, OfferVisibility};
pub use error::GateError;
pub use identity::{IdentityProvider, StaticIdentity, USERNAME_ATTRIBUTE};
pub use policy::{Action, AuthorizationPolicy, Decision, Resource};
pub use registry::{parse_participants, RoleRegistry};
