//! Secondary index maintenance.
//!
//! Each record category keeps one singleton index record listing the ids of
//! its primary records. [`IndexMaintainer`] stages index updates inside the
//! same [`UnitOfWork`] as the primary write, verifies indexes against the
//! primary records actually stored, and rebuilds them when they diverge.
//!
//! Verification and rebuild need key enumeration; backends without it report
//! [`StoreError::Unsupported`].

use std::collections::BTreeSet;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tfl_store::{LedgerStore, StoreError};
use tfl_types::{decode, IndexRecord, PrimaryRecord};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::txn::{fetch_primary, UnitOfWork};

/// Result of comparing an index with the primary records in the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Index record key.
    pub index: String,
    /// Primary records present in the store but absent from the index.
    pub missing: Vec<String>,
    /// Index entries with no primary record behind them.
    pub dangling: Vec<String>,
    /// Entries listed more than once.
    pub duplicates: Vec<String>,
}

impl IndexReport {
    /// Returns `true` if the index matches the stored primary records.
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.dangling.is_empty() && self.duplicates.is_empty()
    }
}

pub struct IndexMaintainer<I> {
    key: String,
    _index: PhantomData<fn() -> I>,
}

impl<I: IndexRecord> IndexMaintainer<I> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            _index: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the index inside a unit of work. A missing record is an empty index.
    pub fn load(&self, uow: &mut UnitOfWork<'_>) -> LedgerResult<I> {
        Ok(uow.load::<I>(&self.key)?.unwrap_or_default())
    }

    /// Read the index directly from the store.
    pub fn read(&self, store: &dyn LedgerStore) -> LedgerResult<I> {
        match store.get(&self.key)? {
            Some(bytes) => Ok(decode(&self.key, &bytes)?),
            None => Ok(I::default()),
        }
    }

    /// Stage an empty index, replacing whatever is stored.
    pub fn stage_reset(&self, uow: &mut UnitOfWork<'_>) -> LedgerResult<()> {
        uow.put(&self.key, &I::default())
    }

    /// Stage `index` with `id` appended. An id already present is left alone.
    pub fn stage_append(&self, uow: &mut UnitOfWork<'_>, mut index: I, id: &str) -> LedgerResult<()> {
        if index.contains(id) {
            warn!(index = %self.key, id, "id already indexed; not appending");
            return Ok(());
        }
        index.entries_mut().push(id.to_string());
        uow.put(&self.key, &index)
    }

    /// Stage `index` without the first entry equal to `id`.
    ///
    /// Returns `false`, staging nothing, when `id` is not indexed.
    pub fn stage_remove(&self, uow: &mut UnitOfWork<'_>, mut index: I, id: &str) -> LedgerResult<bool> {
        if !index.remove(id) {
            return Ok(false);
        }
        uow.put(&self.key, &index)?;
        Ok(true)
    }

    /// Lazily fetch every indexed record in index order.
    ///
    /// The index is read once when this is called; each record is read when
    /// the iterator reaches it.
    pub fn records<'s, T: PrimaryRecord>(
        &self,
        store: &'s dyn LedgerStore,
    ) -> LedgerResult<IndexedRecords<'s, T>> {
        let index = self.read(store)?;
        Ok(IndexedRecords {
            store,
            ids: index.entries().to_vec().into_iter(),
            _record: PhantomData,
        })
    }

    /// Keys holding a primary record of type `T` filed under its own id.
    fn scan<T: PrimaryRecord>(&self, store: &dyn LedgerStore) -> LedgerResult<BTreeSet<String>> {
        let mut found = BTreeSet::new();
        for key in store.keys("")? {
            if key == self.key {
                continue;
            }
            let Some(bytes) = store.get(&key)? else {
                continue;
            };
            match decode::<T>(&key, &bytes) {
                Ok(record) if record.primary_key() == key => {
                    found.insert(key);
                }
                Ok(_) | Err(_) => {}
            }
        }
        Ok(found)
    }

    fn compare(&self, index: &I, live: &BTreeSet<String>) -> IndexReport {
        let mut seen = BTreeSet::new();
        let mut report = IndexReport {
            index: self.key.clone(),
            ..IndexReport::default()
        };
        for id in index.entries() {
            if !seen.insert(id.as_str()) {
                report.duplicates.push(id.clone());
            } else if !live.contains(id) {
                report.dangling.push(id.clone());
            }
        }
        report.missing = live
            .iter()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect();
        report
    }

    /// Compare the index with the primary records of type `T` in the store.
    pub fn verify<T: PrimaryRecord>(&self, store: &dyn LedgerStore) -> LedgerResult<IndexReport> {
        let index = self.read(store)?;
        let live = self.scan::<T>(store)?;
        let report = self.compare(&index, &live);
        if !report.is_consistent() {
            warn!(
                index = %self.key,
                missing = report.missing.len(),
                dangling = report.dangling.len(),
                duplicates = report.duplicates.len(),
                "index diverges from primary records"
            );
        }
        Ok(report)
    }

    /// Rewrite the index from the primary records of type `T`.
    ///
    /// Surviving entries keep their order; missing ids are appended in key
    /// order. Returns what was wrong with the index before the rewrite.
    pub fn rebuild<T: PrimaryRecord>(&self, store: &dyn LedgerStore) -> LedgerResult<IndexReport> {
        let mut uow = UnitOfWork::new(store);
        let index = self.load(&mut uow)?;
        let live = self.scan::<T>(store)?;
        let report = self.compare(&index, &live);
        if report.is_consistent() {
            return Ok(report);
        }

        let mut seen = BTreeSet::new();
        let mut entries: Vec<String> = index
            .entries()
            .iter()
            .filter(|id| live.contains(id.as_str()) && seen.insert(id.as_str()))
            .cloned()
            .collect();
        entries.extend(report.missing.iter().cloned());

        uow.put(&self.key, &I::from_entries(entries))?;
        uow.commit()?;
        info!(
            index = %self.key,
            added = report.missing.len(),
            removed = report.dangling.len() + report.duplicates.len(),
            "index rebuilt"
        );
        Ok(report)
    }

    /// Confirm `id` reached the index after a committed create.
    ///
    /// If it did not, the index is rebuilt from primary records, or, on a
    /// backend without key enumeration, `id` is appended again.
    pub fn confirm<T: PrimaryRecord>(&self, store: &dyn LedgerStore, id: &str) -> LedgerResult<()> {
        if self.read(store)?.contains(id) {
            debug!(index = %self.key, id, "index write confirmed");
            return Ok(());
        }
        warn!(index = %self.key, id, "index is missing a committed id; repairing");
        match self.rebuild::<T>(store) {
            Ok(_) => Ok(()),
            Err(LedgerError::Store(StoreError::Unsupported(_))) => {
                let mut uow = UnitOfWork::new(store);
                let index = self.load(&mut uow)?;
                self.stage_append(&mut uow, index, id)?;
                uow.commit()
            }
            Err(e) => Err(e),
        }
    }
}

/// Iterator over the records named by an index. See [`IndexMaintainer::records`].
pub struct IndexedRecords<'s, T> {
    store: &'s dyn LedgerStore,
    ids: std::vec::IntoIter<String>,
    _record: PhantomData<fn() -> T>,
}

impl<T: PrimaryRecord> Iterator for IndexedRecords<'_, T> {
    type Item = LedgerResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        Some(fetch_primary(self.store, &id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}
