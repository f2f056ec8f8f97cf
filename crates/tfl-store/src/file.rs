//! File-backed ledger store.
//!
//! The whole key space is kept in memory and mirrored to a single JSON file
//! (`{"key": "value", ...}`). Every mutation writes a complete new image to a
//! temporary file in the same directory and atomically renames it over the
//! old one, so a batch is either fully on disk or not at all.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{LedgerStore, WriteOp};

/// A [`LedgerStore`] persisted as one JSON document on disk.
///
/// Values must be UTF-8; ledger records always are.
pub struct FileLedgerStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileLedgerStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = std::fs::read(&path)?;
            if raw.is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_slice(&raw)
                    .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, image: &BTreeMap<String, String>) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let bytes = serde_json::to_vec_pretty(image)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Apply `ops` to a copy of the current image, persist it, then swap it in.
    fn commit(&self, ops: &[WriteOp]) -> StoreResult<()> {
        let mut map = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut next = map.clone();
        for op in ops {
            match op {
                WriteOp::Put { key, value } => {
                    let text = String::from_utf8(value.clone())
                        .map_err(|_| StoreError::backend(key, "value is not valid UTF-8"))?;
                    next.insert(key.clone(), text);
                }
                WriteOp::Delete { key } => {
                    next.remove(key);
                }
            }
        }
        self.persist(&next)?;
        *map = next;
        Ok(())
    }
}

impl LedgerStore for FileLedgerStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(key).map(|v| v.as_bytes().to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.commit(&[WriteOp::put(key, value.to_vec())])
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.commit(&[WriteOp::delete(key)])
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn apply_batch(&self, ops: &[WriteOp]) -> StoreResult<()> {
        self.commit(ops)
    }

    fn atomic_batches(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for FileLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLedgerStore")
            .field("path", &self.path)
            .finish()
    }
}
