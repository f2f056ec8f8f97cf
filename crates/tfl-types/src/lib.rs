//! Foundation types for the Trade Finance Ledger (TFL).
//!
//! This crate provides the records and value types that every other TFL
//! crate reads from and writes to the ledger store.
//!
//! # Key Types
//!
//! - [`Amount`] -- Exact decimal monetary value, stored as a decimal string
//! - [`Principal`] / [`Role`] -- Caller identity and participant role
//! - [`Account`] -- Balance-holding account record
//! - [`Invoice`] / [`InvoiceStatus`] -- Multi-party invoice and its lifecycle
//! - [`AccountIndex`] / [`InvoiceIndex`] -- Singleton id lists for enumeration
//! - [`Record`] -- JSON codec boundary for anything stored under one key

pub mod account;
pub mod amount;
pub mod codec;
pub mod error;
pub mod index;
pub mod invoice;
pub mod principal;

pub use account::Account;
pub use amount::Amount;
pub use codec::{decode, encode, PrimaryRecord, Record};
pub use error::TypeError;
pub use index::{AccountIndex, IndexRecord, InvoiceIndex};
pub use invoice::{Invoice, InvoiceStatus};
pub use principal::{Principal, Role};
