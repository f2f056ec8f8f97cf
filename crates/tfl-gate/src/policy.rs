//! Authorization policy.
//!
//! Every invoice operation asks the policy one question:
//! may `principal`, holding `role`, perform `action` on `resource`? The
//! policy is a pure function of its inputs. Callers look up the role in the
//! [`RoleRegistry`](crate::RoleRegistry) and load the invoice themselves.

use tfl_types::{Invoice, Principal, Role};

use crate::config::{GateConfig, OfferVisibility};

/// Operations subject to authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    CreateInvoice,
    /// Be named as the payer of a new invoice.
    BePayer,
    OfferTrade,
    AcceptTrade,
    ViewInvoice,
    ListOpenOffers,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateInvoice => "create_invoice",
            Action::BePayer => "be_payer",
            Action::OfferTrade => "offer_trade",
            Action::AcceptTrade => "accept_trade",
            Action::ViewInvoice => "view_invoice",
            Action::ListOpenOffers => "list_open_offers",
        }
    }
}

/// The record an action targets.
#[derive(Clone, Copy, Debug)]
pub enum Resource<'a> {
    None,
    Invoice(&'a Invoice),
}

/// Outcome of a policy evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    fn require_role(action: Action, held: Option<Role>, required: Role) -> Self {
        if held == Some(required) {
            Self::Allow
        } else {
            let held = held.map(|r| r.as_str()).unwrap_or("none");
            Self::deny(format!(
                "{} requires role {required}, caller holds {held}",
                action.name()
            ))
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AuthorizationPolicy {
    config: GateConfig,
}

impl AuthorizationPolicy {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        principal: &Principal,
        role: Option<Role>,
        action: Action,
        resource: Resource<'_>,
    ) -> Decision {
        match (action, resource) {
            (Action::CreateInvoice, _) => Decision::require_role(action, role, Role::Supplier),

            (Action::BePayer, _) => {
                if self.config.validate_payer_role {
                    Decision::require_role(action, role, Role::Payer)
                } else {
                    Decision::Allow
                }
            }

            (Action::OfferTrade, Resource::Invoice(invoice)) => {
                if invoice.supplier == *principal {
                    Decision::Allow
                } else {
                    Decision::deny(format!(
                        "offer_trade on {} is reserved to its supplier {}, caller is {principal}",
                        invoice.invoice_id, invoice.supplier
                    ))
                }
            }

            (Action::AcceptTrade, _) => Decision::require_role(action, role, Role::Buyer),

            (Action::ViewInvoice, Resource::Invoice(invoice)) => {
                if invoice.is_party(principal) {
                    Decision::Allow
                } else {
                    Decision::deny(format!(
                        "{principal} is not a party to invoice {}",
                        invoice.invoice_id
                    ))
                }
            }

            (Action::ListOpenOffers, _) => match self.config.open_offer_visibility {
                OfferVisibility::Anyone => Decision::Allow,
                OfferVisibility::Buyers => Decision::require_role(action, role, Role::Buyer),
            },

            (Action::OfferTrade | Action::ViewInvoice, Resource::None) => {
                Decision::deny(format!("{} requires an invoice", action.name()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice() -> Invoice {
        Invoice::new(
            "INV1",
            "100.00".parse().unwrap(),
            "USD",
            Principal::new("sup"),
            Principal::new("pay"),
        )
    }

    fn p(name: &str) -> Principal {
        Principal::new(name)
    }

    #[test]
    fn create_requires_supplier_role() {
        let policy = AuthorizationPolicy::default();
        let ok = policy.evaluate(&p("sup"), Some(Role::Supplier), Action::CreateInvoice, Resource::None);
        assert!(ok.is_allow());
        for role in [None, Some(Role::Payer), Some(Role::Buyer)] {
            let d = policy.evaluate(&p("sup"), role, Action::CreateInvoice, Resource::None);
            assert!(!d.is_allow());
        }
    }

    #[test]
    fn payer_role_check_can_be_disabled() {
        let strict = AuthorizationPolicy::default();
        assert!(!strict
            .evaluate(&p("x"), Some(Role::Buyer), Action::BePayer, Resource::None)
            .is_allow());

        let lax = AuthorizationPolicy::new(GateConfig {
            validate_payer_role: false,
            ..Default::default()
        });
        assert!(lax
            .evaluate(&p("x"), None, Action::BePayer, Resource::None)
            .is_allow());
    }

    #[test]
    fn offer_is_ownership_gated_not_role_gated() {
        let policy = AuthorizationPolicy::default();
        let inv = invoice();
        assert!(policy
            .evaluate(&p("sup"), None, Action::OfferTrade, Resource::Invoice(&inv))
            .is_allow());
        let denied = policy.evaluate(
            &p("other"),
            Some(Role::Supplier),
            Action::OfferTrade,
            Resource::Invoice(&inv),
        );
        match denied {
            Decision::Deny { reason } => assert!(reason.contains("INV1")),
            Decision::Allow => panic!("non-supplier allowed to offer"),
        }
    }

    #[test]
    fn view_requires_party() {
        let policy = AuthorizationPolicy::default();
        let mut inv = invoice();
        let view = |who: &str, inv: &Invoice| {
            policy
                .evaluate(&p(who), None, Action::ViewInvoice, Resource::Invoice(inv))
                .is_allow()
        };
        assert!(view("sup", &inv));
        assert!(view("pay", &inv));
        assert!(!view("buy", &inv));
        inv.buyer = Some(p("buy"));
        assert!(view("buy", &inv));
    }

    #[test]
    fn invoice_actions_without_invoice_are_denied() {
        let policy = AuthorizationPolicy::default();
        assert!(!policy
            .evaluate(&p("sup"), Some(Role::Supplier), Action::ViewInvoice, Resource::None)
            .is_allow());
    }

    #[test]
    fn open_offer_visibility() {
        let anyone = AuthorizationPolicy::default();
        assert!(anyone
            .evaluate(&p("anon"), None, Action::ListOpenOffers, Resource::None)
            .is_allow());

        let buyers = AuthorizationPolicy::new(GateConfig {
            open_offer_visibility: OfferVisibility::Buyers,
            ..Default::default()
        });
        assert!(!buyers
            .evaluate(&p("anon"), None, Action::ListOpenOffers, Resource::None)
            .is_allow());
        assert!(buyers
            .evaluate(&p("b"), Some(Role::Buyer), Action::ListOpenOffers, Resource::None)
            .is_allow());
    }
}
