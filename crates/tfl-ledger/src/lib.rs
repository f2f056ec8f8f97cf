//! Core ledger logic for the Trade Finance Ledger (TFL).
//!
//! This crate is the heart of TFL. It provides:
//! - `AccountLedger`: account creation and balance transfers that conserve
//!   the total and never drive a balance negative
//! - `InvoiceLedger`: the `CREATED -> OFFERED -> ACCEPTED` invoice lifecycle,
//!   gated by role and ownership
//! - `IndexMaintainer`: account and invoice indexes kept in step with their
//!   primary records, with verification and rebuild
//! - `UnitOfWork`: reads first, writes staged and committed as one batch,
//!   with compensation on stores without atomic batches
//! - `Chaincode`: the positional `invoke` / `query` surface

pub mod accounts;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod index;
pub mod invoices;
pub mod txn;
pub mod validation;

pub use accounts::AccountLedger;
pub use config::{CallerSource, LedgerConfig};
pub use dispatch::{Chaincode, PING_RESPONSE};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use index::{IndexMaintainer, IndexReport, IndexedRecords};
pub use invoices::InvoiceLedger;
pub use txn::UnitOfWork;
