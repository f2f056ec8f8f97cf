//! Positional-argument entry points.
//!
//! [`Chaincode`] exposes the ledger the way a host ledger drives it: a
//! mutating `invoke(function, args)`, a read-only `query(function, args)`,
//! and `init(args)` for setup. Arguments are positional strings; results are
//! bytes, JSON for records and lists.
//!
//! | verb   | function                            | arguments                              |
//! |--------|-------------------------------------|----------------------------------------|
//! | invoke | `init`                              | `[name role]...`                       |
//! | invoke | `init_account`, `create_account`    | `number owner currency balance`        |
//! | invoke | `transfer_balance`                  | `from to amount`                       |
//! | invoke | `delete`                            | `number`                               |
//! | invoke | `write`                             | `key value`                            |
//! | invoke | `create_invoice`                    | `id amount supplier payer` *           |
//! | invoke | `offer_trade`                       | `id discount caller` *                 |
//! | invoke | `accept_trade`                      | `id caller` *                          |
//! | query  | `read`                              | `key`                                  |
//! | query  | `get_account`                       | `number`                               |
//! | query  | `list_accounts`                     |                                        |
//! | query  | `get_invoice_details`               | `id caller` *                          |
//! | query  | `get_invoices`, `list_invoices`     | `caller` *                             |
//! | query  | `get_opening_trade_invoices`        | `[caller]` *                           |
//! | query  | `check_unique_invoice`              | `id`                                   |
//! | query  | `get_username`                      |                                        |
//! | both   | `ping`                              |                                        |
//!
//! `*` With `caller_source = "identity"` the caller argument (the supplier,
//! for `create_invoice`) is dropped and taken from the identity provider.

use std::sync::Arc;

use serde::Serialize;
use tfl_gate::{parse_participants, IdentityProvider, USERNAME_ATTRIBUTE};
use tfl_store::{LedgerStore, StoreError};
use tfl_types::Principal;
use tracing::{debug, info, warn};

use crate::accounts::AccountLedger;
use crate::config::{CallerSource, LedgerConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::invoices::InvoiceLedger;
use crate::txn::UnitOfWork;
use crate::validation::{require_arity, require_non_empty};

pub const PING_RESPONSE: &[u8] = b"Hello, world!";

pub struct Chaincode {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
    identity: Arc<dyn IdentityProvider>,
    accounts: AccountLedger,
    invoices: InvoiceLedger,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()).into())
}

impl Chaincode {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        identity: Arc<dyn IdentityProvider>,
        config: LedgerConfig,
    ) -> LedgerResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let accounts = AccountLedger::new(store.clone(), config.clone());
        let invoices = InvoiceLedger::new(store.clone(), config.clone());
        Ok(Self {
            store,
            config,
            identity,
            accounts,
            invoices,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn accounts(&self) -> &AccountLedger {
        &self.accounts
    }

    pub fn invoices(&self) -> &InvoiceLedger {
        &self.invoices
    }

    /// Reset both indexes and register `name, role` participant pairs.
    pub fn init(&self, args: &[String]) -> LedgerResult<Vec<u8>> {
        let participants = parse_participants(args)?;

        let mut uow = UnitOfWork::new(self.store.as_ref());
        for key in [self.accounts.index().key(), self.invoices.index().key()] {
            if uow.get(key)?.is_some() {
                warn!(index = key, "resetting existing index");
            }
        }
        self.accounts.index().stage_reset(&mut uow)?;
        self.invoices.index().stage_reset(&mut uow)?;
        for op in self.invoices.registry().registration_ops(&participants) {
            uow.stage_op(op)?;
        }
        uow.commit()?;

        info!(participants = participants.len(), "ledger initialised");
        Ok(Vec::new())
    }

    /// Mutating entry point.
    pub fn invoke(&self, function: &str, args: &[String]) -> LedgerResult<Vec<u8>> {
        debug!(function, args = args.len(), "invoke");
        match function {
            "init" => self.init(args),
            "init_account" | "create_account" => {
                require_arity(function, args, 4)?;
                let account = self
                    .accounts
                    .create_account(&args[0], &args[1], &args[2], &args[3])?;
                to_json(&account)
            }
            "transfer_balance" => {
                require_arity(function, args, 3)?;
                let (from, to) = self.accounts.transfer_balance(&args[0], &args[1], &args[2])?;
                to_json(&[from, to])
            }
            "delete" => {
                require_arity(function, args, 1)?;
                let existed = self.accounts.delete_account(&args[0])?;
                to_json(&existed)
            }
            "write" => {
                require_arity(function, args, 2)?;
                self.write(&args[0], &args[1])
            }
            "create_invoice" => {
                let (supplier, args) = match self.config.caller_source {
                    CallerSource::Arguments => {
                        require_arity(function, args, 4)?;
                        require_non_empty("supplier", &args[2])?;
                        let rest = [args[0].clone(), args[1].clone(), args[3].clone()];
                        (Principal::new(args[2].clone()), rest)
                    }
                    CallerSource::Identity => {
                        require_arity(function, args, 3)?;
                        let rest = [args[0].clone(), args[1].clone(), args[2].clone()];
                        (self.identity.current_principal()?, rest)
                    }
                };
                let payer = Principal::new(args[2].clone());
                let invoice = self
                    .invoices
                    .create_invoice(&args[0], &args[1], &supplier, &payer)?;
                to_json(&invoice)
            }
            "offer_trade" => {
                let (args, caller) = self.caller_args(function, args, 2)?;
                let invoice = self.invoices.offer_trade(&args[0], &args[1], &caller)?;
                to_json(&invoice)
            }
            "accept_trade" => {
                let (args, caller) = self.caller_args(function, args, 1)?;
                let invoice = self.invoices.accept_trade(&args[0], &caller)?;
                to_json(&invoice)
            }
            "ping" => Ok(PING_RESPONSE.to_vec()),
            other => Err(LedgerError::UnknownFunction(other.to_string())),
        }
    }

    /// Read-only entry point.
    pub fn query(&self, function: &str, args: &[String]) -> LedgerResult<Vec<u8>> {
        debug!(function, args = args.len(), "query");
        match function {
            "read" => {
                require_arity(function, args, 1)?;
                self.read(&args[0])
            }
            "get_account" => {
                require_arity(function, args, 1)?;
                to_json(&self.accounts.get_account(&args[0])?)
            }
            "list_accounts" => {
                require_arity(function, args, 0)?;
                to_json(&self.accounts.list_accounts()?)
            }
            "get_invoice_details" => {
                let (args, caller) = self.caller_args(function, args, 1)?;
                to_json(&self.invoices.get_invoice_details(&args[0], &caller)?)
            }
            "get_invoices" | "list_invoices" => {
                let (_, caller) = self.caller_args(function, args, 0)?;
                to_json(&self.invoices.list_invoices(&caller)?)
            }
            "get_opening_trade_invoices" => {
                let caller = match self.config.caller_source {
                    CallerSource::Arguments if args.is_empty() => None,
                    _ => Some(self.caller_args(function, args, 0)?.1),
                };
                to_json(&self.invoices.list_open_trade_offers(caller.as_ref())?)
            }
            "check_unique_invoice" => {
                require_arity(function, args, 1)?;
                to_json(&self.invoices.check_unique_invoice(&args[0])?)
            }
            "get_username" => {
                require_arity(function, args, 0)?;
                Ok(self.identity.attribute(USERNAME_ATTRIBUTE)?.into_bytes())
            }
            "ping" => Ok(PING_RESPONSE.to_vec()),
            other => Err(LedgerError::UnknownFunction(other.to_string())),
        }
    }

    /// Split `args` into `fixed` leading arguments and the caller.
    fn caller_args<'a>(
        &self,
        function: &str,
        args: &'a [String],
        fixed: usize,
    ) -> LedgerResult<(&'a [String], Principal)> {
        match self.config.caller_source {
            CallerSource::Arguments => {
                require_arity(function, args, fixed + 1)?;
                require_non_empty("caller", &args[fixed])?;
                Ok((&args[..fixed], Principal::new(args[fixed].clone())))
            }
            CallerSource::Identity => {
                require_arity(function, args, fixed)?;
                Ok((args, self.identity.current_principal()?))
            }
        }
    }

    fn read(&self, key: &str) -> LedgerResult<Vec<u8>> {
        require_non_empty("key", key)?;
        self.store
            .get(key)?
            .ok_or_else(|| LedgerError::not_found("key", key))
    }

    /// Ungated single-key put. Indexes are not touched.
    fn write(&self, key: &str, value: &str) -> LedgerResult<Vec<u8>> {
        require_non_empty("key", key)?;
        if self.config.is_reserved_key(key) {
            warn!(key, "raw write to an index record");
        }
        self.store.put(key, value.as_bytes())?;
        debug!(key, bytes = value.len(), "raw write");
        Ok(Vec::new())
    }
}
