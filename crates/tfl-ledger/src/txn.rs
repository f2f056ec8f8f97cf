//! Unit of work: one ledger operation's reads and staged writes.
//!
//! An operation reads everything it needs first, stages every write, then
//! commits them with a single [`LedgerStore::apply_batch`]. Backends with
//! atomic batches commit all-or-nothing. On other backends a failed commit is
//! compensated by writing back the value each staged key held before the
//! operation started.

use std::collections::{BTreeMap, BTreeSet};

use tfl_store::{LedgerStore, StoreError, WriteOp};
use tfl_types::{decode, encode, PrimaryRecord, Record};
use tracing::{error, warn};

use crate::error::{LedgerError, LedgerResult};

pub struct UnitOfWork<'s> {
    store: &'s dyn LedgerStore,
    pre_images: BTreeMap<String, Option<Vec<u8>>>,
    writes: Vec<WriteOp>,
}

impl<'s> UnitOfWork<'s> {
    pub fn new(store: &'s dyn LedgerStore) -> Self {
        Self {
            store,
            pre_images: BTreeMap::new(),
            writes: Vec::new(),
        }
    }

    /// Read raw bytes at `key`.
    pub fn get(&mut self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        debug_assert!(self.writes.is_empty(), "read of {key} after a staged write");
        let value = self.store.get(key)?;
        self.pre_images
            .entry(key.to_string())
            .or_insert_with(|| value.clone());
        Ok(value)
    }

    /// Read and decode the record at `key`.
    pub fn load<T: Record>(&mut self, key: &str) -> LedgerResult<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(decode(key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Read the primary record at `key`, failing with `NotFound` if absent.
    pub fn load_primary<T: PrimaryRecord>(&mut self, key: &str) -> LedgerResult<T> {
        match self.get(key)? {
            Some(bytes) => primary_from_bytes(key, &bytes),
            None => Err(LedgerError::not_found(T::KIND, key)),
        }
    }

    /// Stage `record` to be written at `key`.
    pub fn put<T: Record>(&mut self, key: &str, record: &T) -> LedgerResult<()> {
        let bytes = encode(record)?;
        self.stage(WriteOp::put(key, bytes))
    }

    pub fn put_raw(&mut self, key: &str, bytes: Vec<u8>) -> LedgerResult<()> {
        self.stage(WriteOp::put(key, bytes))
    }

    pub fn delete(&mut self, key: &str) -> LedgerResult<()> {
        self.stage(WriteOp::delete(key))
    }

    /// Stage an already-built write.
    pub fn stage_op(&mut self, op: WriteOp) -> LedgerResult<()> {
        self.stage(op)
    }

    /// Writes staged so far, in order.
    pub fn staged(&self) -> &[WriteOp] {
        &self.writes
    }

    fn stage(&mut self, op: WriteOp) -> LedgerResult<()> {
        if !self.pre_images.contains_key(op.key()) {
            let before = self.store.get(op.key())?;
            self.pre_images.insert(op.key().to_string(), before);
        }
        self.writes.push(op);
        Ok(())
    }

    /// Apply every staged write.
    pub fn commit(self) -> LedgerResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        match self.store.apply_batch(&self.writes) {
            Ok(()) => Ok(()),
            Err(err) if self.store.atomic_batches() => Err(err.into()),
            Err(err) => {
                warn!(error = %err, writes = self.writes.len(), "batch failed on non-atomic store; compensating");
                Err(self.compensate(err))
            }
        }
    }

    /// Restore the pre-image of every staged key that no longer holds it.
    fn compensate(&self, cause: StoreError) -> LedgerError {
        let mut seen = BTreeSet::new();
        let mut unrestored = Vec::new();

        for op in self.writes.iter().rev() {
            let key = op.key();
            if !seen.insert(key) {
                continue;
            }
            let Some(before) = self.pre_images.get(key) else {
                continue;
            };
            match self.store.get(key) {
                Ok(current) if current == *before => continue,
                Ok(_) => {}
                Err(e) => {
                    error!(key, error = %e, "cannot read key during compensation");
                    unrestored.push(key.to_string());
                    continue;
                }
            }
            let restored = match before {
                Some(bytes) => self.store.put(key, bytes),
                None => self.store.delete(key),
            };
            if let Err(e) = restored {
                error!(key, error = %e, "compensation failed");
                unrestored.push(key.to_string());
            }
        }

        if unrestored.is_empty() {
            LedgerError::Store(cause)
        } else {
            LedgerError::PartialWrite {
                cause: cause.to_string(),
                unrestored,
            }
        }
    }
}

/// Decode a primary record, rejecting one filed under a key other than its own.
pub(crate) fn primary_from_bytes<T: PrimaryRecord>(key: &str, bytes: &[u8]) -> LedgerResult<T> {
    let record: T = decode(key, bytes)?;
    if record.primary_key() != key {
        warn!(key, found = record.primary_key(), kind = T::KIND, "record filed under a foreign key");
        return Err(LedgerError::not_found(T::KIND, key));
    }
    Ok(record)
}

/// Read a primary record outside a unit of work.
pub(crate) fn fetch_primary<T: PrimaryRecord>(store: &dyn LedgerStore, key: &str) -> LedgerResult<T> {
    match store.get(key)? {
        Some(bytes) => primary_from_bytes(key, &bytes),
        None => Err(LedgerError::not_found(T::KIND, key)),
    }
}
