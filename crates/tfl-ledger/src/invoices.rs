//! Invoice ledger: the invoice lifecycle, role and ownership gating, and the
//! invoice index.
//!
//! ```text
//! CREATED --offer_trade (supplier)--> OFFERED --accept_trade (buyer)--> ACCEPTED
//! ```
//!
//! Every operation re-reads the caller's role from the [`RoleRegistry`] and
//! asks the [`AuthorizationPolicy`] before staging any write.

use std::sync::Arc;

use tfl_gate::{Action, AuthorizationPolicy, Decision, RoleRegistry, Resource};
use tfl_store::LedgerStore;
use tfl_types::{Invoice, InvoiceIndex, InvoiceStatus, Principal, Record, Role};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::index::{IndexMaintainer, IndexReport, IndexedRecords};
use crate::txn::{fetch_primary, UnitOfWork};
use crate::validation::{
    parse_non_negative_amount, parse_positive_amount, require_non_empty, require_record_id,
};

pub struct InvoiceLedger {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
    registry: RoleRegistry,
    policy: AuthorizationPolicy,
    index: IndexMaintainer<InvoiceIndex>,
}

impl InvoiceLedger {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        let registry = RoleRegistry::new(store.clone(), config.gate.role_key_prefix.clone());
        let policy = AuthorizationPolicy::new(config.gate.clone());
        let index = IndexMaintainer::new(config.invoice_index_key.clone());
        Self {
            store,
            config,
            registry,
            policy,
            index,
        }
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn index(&self) -> &IndexMaintainer<InvoiceIndex> {
        &self.index
    }

    fn authorize(
        &self,
        principal: &Principal,
        action: Action,
        resource: Resource<'_>,
    ) -> LedgerResult<()> {
        let role = self.registry.role_of(principal)?;
        match self.policy.evaluate(principal, role, action, resource) {
            Decision::Allow => Ok(()),
            Decision::Deny { reason } => {
                debug!(%principal, action = action.name(), %reason, "denied");
                Err(LedgerError::PermissionDenied(reason))
            }
        }
    }

    fn require_status(invoice: &Invoice, expected: InvoiceStatus) -> LedgerResult<()> {
        if invoice.status != expected {
            return Err(LedgerError::InvalidState {
                invoice_id: invoice.invoice_id.clone(),
                actual: invoice.status,
                expected,
            });
        }
        Ok(())
    }

    /// Create an invoice from `supplier` to `payer` and index it.
    pub fn create_invoice(
        &self,
        invoice_id: &str,
        amount: &str,
        supplier: &Principal,
        payer: &Principal,
    ) -> LedgerResult<Invoice> {
        require_record_id(&self.config, "invoice id", invoice_id)?;
        let amount = parse_positive_amount("amount", amount)?;
        require_non_empty("supplier", supplier.as_str())?;
        require_non_empty("payer", payer.as_str())?;

        self.authorize(supplier, Action::CreateInvoice, Resource::None)?;
        self.authorize(payer, Action::BePayer, Resource::None)?;

        let mut uow = UnitOfWork::new(self.store.as_ref());
        if uow.get(invoice_id)?.is_some() {
            return Err(LedgerError::already_exists(Invoice::KIND, invoice_id));
        }
        let index = self.index.load(&mut uow)?;

        let invoice = Invoice::new(
            invoice_id,
            amount,
            self.config.default_currency.clone(),
            supplier.clone(),
            payer.clone(),
        );
        uow.put(invoice_id, &invoice)?;
        self.index.stage_append(&mut uow, index, invoice_id)?;
        uow.commit()?;

        if self.config.verify_index_writes {
            self.index.confirm::<Invoice>(self.store.as_ref(), invoice_id)?;
        }
        debug!(invoice = invoice_id, %supplier, %payer, %amount, "invoice created");
        Ok(invoice)
    }

    /// The supplier offers a created invoice for trade at `discount`.
    pub fn offer_trade(
        &self,
        invoice_id: &str,
        discount: &str,
        caller: &Principal,
    ) -> LedgerResult<Invoice> {
        require_non_empty("invoice id", invoice_id)?;
        let discount = parse_non_negative_amount("discount", discount)?;

        let mut uow = UnitOfWork::new(self.store.as_ref());
        let mut invoice = uow.load_primary::<Invoice>(invoice_id)?;
        self.authorize(caller, Action::OfferTrade, Resource::Invoice(&invoice))?;
        Self::require_status(&invoice, InvoiceStatus::Created)?;
        if discount > invoice.amount {
            return Err(LedgerError::Validation(format!(
                "discount {discount} exceeds invoice amount {}",
                invoice.amount
            )));
        }

        invoice.discount = Some(discount);
        invoice.status = InvoiceStatus::Offered;
        uow.put(invoice_id, &invoice)?;
        uow.commit()?;

        debug!(invoice = invoice_id, %discount, "trade offered");
        Ok(invoice)
    }

    /// A buyer accepts an offered invoice and becomes bound to it.
    pub fn accept_trade(&self, invoice_id: &str, caller: &Principal) -> LedgerResult<Invoice> {
        require_non_empty("invoice id", invoice_id)?;

        let mut uow = UnitOfWork::new(self.store.as_ref());
        let mut invoice = uow.load_primary::<Invoice>(invoice_id)?;
        self.authorize(caller, Action::AcceptTrade, Resource::Invoice(&invoice))?;
        Self::require_status(&invoice, InvoiceStatus::Offered)?;

        invoice.buyer = Some(caller.clone());
        invoice.status = InvoiceStatus::Accepted;
        uow.put(invoice_id, &invoice)?;
        uow.commit()?;

        debug!(invoice = invoice_id, buyer = %caller, "trade accepted");
        Ok(invoice)
    }

    /// The full invoice, for one of its parties.
    pub fn get_invoice_details(&self, invoice_id: &str, caller: &Principal) -> LedgerResult<Invoice> {
        require_non_empty("invoice id", invoice_id)?;
        let invoice = fetch_primary::<Invoice>(self.store.as_ref(), invoice_id)?;
        self.authorize(caller, Action::ViewInvoice, Resource::Invoice(&invoice))?;
        Ok(invoice)
    }

    /// Every indexed invoice, fetched lazily in index order.
    ///
    /// Each call reads a fresh snapshot of the index.
    pub fn invoices(&self) -> LedgerResult<IndexedRecords<'_, Invoice>> {
        self.index.records::<Invoice>(self.store.as_ref())
    }

    /// Invoices `caller` is a party to. Others are skipped without error.
    pub fn list_invoices(&self, caller: &Principal) -> LedgerResult<Vec<Invoice>> {
        let role = self.registry.role_of(caller)?;
        let mut visible = Vec::new();
        for invoice in self.invoices()? {
            let invoice = invoice?;
            if self
                .policy
                .evaluate(caller, role, Action::ViewInvoice, Resource::Invoice(&invoice))
                .is_allow()
            {
                visible.push(invoice);
            }
        }
        Ok(visible)
    }

    /// Invoices currently offered for trade.
    ///
    /// Visibility follows the configured policy; with the default policy any
    /// caller, including an anonymous one, sees every open offer.
    pub fn list_open_trade_offers(&self, caller: Option<&Principal>) -> LedgerResult<Vec<Invoice>> {
        let anonymous = Principal::new("");
        let principal = caller.unwrap_or(&anonymous);
        self.authorize(principal, Action::ListOpenOffers, Resource::None)?;

        let mut open = Vec::new();
        for invoice in self.invoices()? {
            let invoice = invoice?;
            if invoice.status == InvoiceStatus::Offered {
                open.push(invoice);
            }
        }
        Ok(open)
    }

    /// Returns `true` if nothing is stored under `invoice_id`.
    pub fn check_unique_invoice(&self, invoice_id: &str) -> LedgerResult<bool> {
        require_non_empty("invoice id", invoice_id)?;
        Ok(self.store.get(invoice_id)?.is_none())
    }

    /// Register participants immediately, outside ledger setup.
    pub fn register_participants(&self, participants: &[(Principal, Role)]) -> LedgerResult<()> {
        for (principal, role) in participants {
            self.registry.register(principal, *role)?;
        }
        Ok(())
    }

    pub fn verify_index(&self) -> LedgerResult<IndexReport> {
        self.index.verify::<Invoice>(self.store.as_ref())
    }

    pub fn rebuild_index(&self) -> LedgerResult<IndexReport> {
        self.index.rebuild::<Invoice>(self.store.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tfl_gate::OfferVisibility;
    use tfl_store::{FaultyStore, InMemoryLedgerStore};

    fn p(name: &str) -> Principal {
        Principal::new(name)
    }

    fn ledger_with(config: LedgerConfig) -> (Arc<InMemoryLedgerStore>, InvoiceLedger) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = InvoiceLedger::new(store.clone(), Arc::new(config));
        ledger
            .register_participants(&[
                (p("supplier1"), Role::Supplier),
                (p("supplier2"), Role::Supplier),
                (p("payer1"), Role::Payer),
                (p("buyer1"), Role::Buyer),
                (p("buyer2"), Role::Buyer),
            ])
            .unwrap();
        (store, ledger)
    }

    fn ledger() -> (Arc<InMemoryLedgerStore>, InvoiceLedger) {
        ledger_with(LedgerConfig::default())
    }

    fn status(ledger: &InvoiceLedger, id: &str) -> InvoiceStatus {
        ledger.get_invoice_details(id, &p("supplier1")).unwrap().status
    }

    #[test]
    fn scenario_c_non_supplier_cannot_offer() {
        let (_, ledger) = ledger();
        let invoice = ledger
            .create_invoice("INV1", "100.00", &p("supplier1"), &p("payer1"))
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Created);
        assert_eq!(invoice.currency, "USD");
        assert_eq!(invoice.buyer, None);
        assert_eq!(invoice.discount, None);

        for caller in ["supplier2", "payer1", "buyer1"] {
            let err = ledger.offer_trade("INV1", "5.00", &p(caller)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionDenied, "{caller}");
        }
        assert_eq!(status(&ledger, "INV1"), InvoiceStatus::Created);
    }

    #[test]
    fn scenario_d_offer_then_accept() {
        let (_, ledger) = ledger();
        ledger
            .create_invoice("INV1", "100.00", &p("supplier1"), &p("payer1"))
            .unwrap();

        let offered = ledger.offer_trade("INV1", "5.00", &p("supplier1")).unwrap();
        assert_eq!(offered.status, InvoiceStatus::Offered);
        assert_eq!(offered.discount.unwrap().to_string(), "5.00");

        let accepted = ledger.accept_trade("INV1", &p("buyer1")).unwrap();
        assert_eq!(accepted.status, InvoiceStatus::Accepted);
        assert_eq!(accepted.buyer, Some(p("buyer1")));

        let err = ledger.accept_trade("INV1", &p("buyer2")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let stored = ledger.get_invoice_details("INV1", &p("buyer1")).unwrap();
        assert_eq!(stored, accepted);
    }

    #[test]
    fn status_only_moves_forward() {
        let (_, ledger) = ledger();
        ledger
            .create_invoice("INV1", "100.00", &p("supplier1"), &p("payer1"))
            .unwrap();
        let before = ledger.get_invoice_details("INV1", &p("payer1")).unwrap();

        let err = ledger.accept_trade("INV1", &p("buyer1")).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidState {
                actual: InvoiceStatus::Created,
                expected: InvoiceStatus::Offered,
                ..
            }
        ));
        assert_eq!(ledger.get_invoice_details("INV1", &p("payer1")).unwrap(), before);

        ledger.offer_trade("INV1", "1", &p("supplier1")).unwrap();
        let err = ledger.offer_trade("INV1", "2", &p("supplier1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        ledger.accept_trade("INV1", &p("buyer1")).unwrap();
        let err = ledger.offer_trade("INV1", "2", &p("supplier1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(status(&ledger, "INV1"), InvoiceStatus::Accepted);
    }

    #[test]
    fn create_checks_roles_then_existence() {
        let (store, ledger) = ledger();
        let err = ledger
            .create_invoice("INV1", "10", &p("buyer1"), &p("payer1"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        let err = ledger
            .create_invoice("INV1", "10", &p("supplier1"), &p("buyer1"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        let err = ledger
            .create_invoice("INV1", "10", &p("stranger"), &p("payer1"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(store.get("INV1").unwrap().is_none());

        let original = ledger
            .create_invoice("INV1", "10", &p("supplier1"), &p("payer1"))
            .unwrap();
        let err = ledger
            .create_invoice("INV1", "99", &p("supplier2"), &p("payer1"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(ledger.get_invoice_details("INV1", &p("payer1")).unwrap(), original);
        assert_eq!(ledger.index().read(store.as_ref()).unwrap().invoice_ids, vec!["INV1"]);
    }

    #[test]
    fn payer_role_check_can_be_disabled() {
        let mut config = LedgerConfig::default();
        config.gate.validate_payer_role = false;
        let (_, ledger) = ledger_with(config);
        ledger
            .create_invoice("INV1", "10", &p("supplier1"), &p("anyone"))
            .unwrap();
    }

    #[test]
    fn create_validates_arguments() {
        let (_, ledger) = ledger();
        for (id, amount) in [("", "10"), ("INV1", "0"), ("INV1", "ten"), ("invoiceIDs", "10")] {
            let err = ledger
                .create_invoice(id, amount, &p("supplier1"), &p("payer1"))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{id:?} {amount:?}");
        }
    }

    #[test]
    fn offer_validates_discount() {
        let (_, ledger) = ledger();
        ledger
            .create_invoice("INV1", "100.00", &p("supplier1"), &p("payer1"))
            .unwrap();
        for bad in ["-1", "x", "100.01"] {
            let err = ledger.offer_trade("INV1", bad, &p("supplier1")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad}");
        }
        let err = ledger.offer_trade("NOPE", "1", &p("supplier1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = ledger.accept_trade("NOPE", &p("buyer1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn accept_requires_buyer_role() {
        let (_, ledger) = ledger();
        ledger
            .create_invoice("INV1", "100", &p("supplier1"), &p("payer1"))
            .unwrap();
        ledger.offer_trade("INV1", "5", &p("supplier1")).unwrap();
        for caller in ["supplier1", "payer1", "stranger"] {
            let err = ledger.accept_trade("INV1", &p(caller)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionDenied, "{caller}");
        }
        assert_eq!(status(&ledger, "INV1"), InvoiceStatus::Offered);
    }

    #[test]
    fn details_are_for_parties_only() {
        let (_, ledger) = ledger();
        ledger
            .create_invoice("INV1", "100", &p("supplier1"), &p("payer1"))
            .unwrap();
        ledger.get_invoice_details("INV1", &p("payer1")).unwrap();
        let err = ledger.get_invoice_details("INV1", &p("buyer1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        ledger.offer_trade("INV1", "5", &p("supplier1")).unwrap();
        ledger.accept_trade("INV1", &p("buyer1")).unwrap();
        ledger.get_invoice_details("INV1", &p("buyer1")).unwrap();
        let err = ledger.get_invoice_details("INV1", &p("buyer2")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn listing_filters_by_party_and_status() {
        let (_, ledger) = ledger();
        for (id, supplier) in [("INV1", "supplier1"), ("INV2", "supplier2"), ("INV3", "supplier1")] {
            ledger
                .create_invoice(id, "100", &p(supplier), &p("payer1"))
                .unwrap();
        }
        ledger.offer_trade("INV2", "1", &p("supplier2")).unwrap();
        ledger.offer_trade("INV3", "1", &p("supplier1")).unwrap();

        let ids = |list: Vec<Invoice>| list.into_iter().map(|i| i.invoice_id).collect::<Vec<_>>();
        assert_eq!(ids(ledger.list_invoices(&p("supplier1")).unwrap()), vec!["INV1", "INV3"]);
        assert_eq!(ids(ledger.list_invoices(&p("payer1")).unwrap()).len(), 3);
        assert!(ledger.list_invoices(&p("buyer1")).unwrap().is_empty());

        assert_eq!(ids(ledger.list_open_trade_offers(None).unwrap()), vec!["INV2", "INV3"]);
        assert_eq!(ledger.list_open_trade_offers(Some(&p("payer1"))).unwrap().len(), 2);
        assert_eq!(ledger.invoices().unwrap().count(), 3);
    }

    #[test]
    fn open_offers_can_be_restricted_to_buyers() {
        let mut config = LedgerConfig::default();
        config.gate.open_offer_visibility = OfferVisibility::Buyers;
        let (_, ledger) = ledger_with(config);
        ledger
            .create_invoice("INV1", "100", &p("supplier1"), &p("payer1"))
            .unwrap();
        ledger.offer_trade("INV1", "1", &p("supplier1")).unwrap();

        assert_eq!(ledger.list_open_trade_offers(Some(&p("buyer1"))).unwrap().len(), 1);
        let err = ledger.list_open_trade_offers(Some(&p("payer1"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        let err = ledger.list_open_trade_offers(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn listing_surfaces_missing_records() {
        let (store, ledger) = ledger();
        ledger
            .create_invoice("INV1", "100", &p("supplier1"), &p("payer1"))
            .unwrap();
        store.delete("INV1").unwrap();
        let err = ledger.list_invoices(&p("payer1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let report = ledger.rebuild_index().unwrap();
        assert_eq!(report.dangling, vec!["INV1"]);
        assert!(ledger.list_invoices(&p("payer1")).unwrap().is_empty());
    }

    #[test]
    fn check_unique_invoice_sees_any_key() {
        let (_, ledger) = ledger();
        assert!(ledger.check_unique_invoice("INV1").unwrap());
        ledger
            .create_invoice("INV1", "100", &p("supplier1"), &p("payer1"))
            .unwrap();
        assert!(!ledger.check_unique_invoice("INV1").unwrap());
        assert!(!ledger.check_unique_invoice("buyer1").unwrap());
    }

    #[test]
    fn role_prefix_moves_registry_keys() {
        let mut config = LedgerConfig::default();
        config.gate.role_key_prefix = "role:".into();
        let (store, ledger) = ledger_with(config);
        assert_eq!(store.get("role:supplier1").unwrap().unwrap(), b"supplier");
        assert!(ledger.check_unique_invoice("supplier1").unwrap());
        ledger
            .create_invoice("supplier1", "100", &p("supplier1"), &p("payer1"))
            .unwrap();
    }

    #[test]
    fn failed_offer_on_non_atomic_store_keeps_record() {
        let store = Arc::new(FaultyStore::new(InMemoryLedgerStore::new()));
        let ledger = InvoiceLedger::new(store.clone(), Arc::new(LedgerConfig::default()));
        ledger
            .register_participants(&[(p("s"), Role::Supplier), (p("y"), Role::Payer)])
            .unwrap();
        ledger.create_invoice("INV1", "100", &p("s"), &p("y")).unwrap();

        store.fail_writes_to("INV1");
        let err = ledger.offer_trade("INV1", "5", &p("s")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(
            ledger.get_invoice_details("INV1", &p("s")).unwrap().status,
            InvoiceStatus::Created
        );
    }

    #[test]
    fn failed_create_is_rolled_back() {
        let store = Arc::new(FaultyStore::new(InMemoryLedgerStore::new()));
        let ledger = InvoiceLedger::new(store.clone(), Arc::new(LedgerConfig::default()));
        ledger
            .register_participants(&[(p("s"), Role::Supplier), (p("y"), Role::Payer)])
            .unwrap();

        store.fail_writes_to("invoiceIDs");
        let err = ledger.create_invoice("INV1", "100", &p("s"), &p("y")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
        store.heal();
        assert!(ledger.check_unique_invoice("INV1").unwrap());
        assert!(ledger.verify_index().unwrap().is_consistent());
    }
}
