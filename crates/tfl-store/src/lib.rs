//! Ledger store backends for the Trade Finance Ledger.
//!
//! The ledger store is the only durable state in TFL: a flat key space of
//! opaque string keys mapping to opaque byte values, offering single-key
//! `get` / `put` / `delete`. Everything above it (accounts, invoices,
//! indexes, role records) is reconstructed from these bytes on every call.
//!
//! # Storage Backends
//!
//! All backends implement the [`LedgerStore`] trait:
//!
//! - [`InMemoryLedgerStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FileLedgerStore`] -- JSON document on disk, replaced atomically per batch
//! - [`FaultyStore`] -- wrapper that injects write failures, non-atomic batches
//!
//! # Design Rules
//!
//! 1. The store never interprets values.
//! 2. Multi-key writes go through [`LedgerStore::apply_batch`]; only backends
//!    that report [`LedgerStore::atomic_batches`] promise all-or-nothing.
//! 3. Key enumeration is optional; callers degrade when it is unsupported.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fault;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fault::FaultyStore;
pub use file::FileLedgerStore;
pub use memory::InMemoryLedgerStore;
pub use traits::{LedgerStore, WriteOp};
