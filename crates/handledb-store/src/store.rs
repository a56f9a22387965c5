//! The handle store.
//!
//! `HandleStore` owns the token→table map and the optional durable log.
//! It is the only shared mutable resource in the system: reads of
//! different tokens run concurrently under the read lock, while
//! `create`/`rebind` serialize through the write lock and the log file
//! mutex. Handles are never deleted; a minted token resolves for the
//! lifetime of the store file.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, info};

use handledb_core::Table;

use crate::error::StoreResult;
use crate::handle::Handle;
use crate::log::StoreLog;

/// Durable key→table mapping; the persistence and identity authority.
#[derive(Debug)]
pub struct HandleStore {
    /// Current bindings.
    bindings: RwLock<HashMap<String, Table>>,
    /// Durable log, absent in memory-only mode.
    log: Option<StoreLog>,
}

impl HandleStore {
    /// Creates a memory-only store. State does not survive the process.
    pub fn in_memory() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            log: None,
        }
    }

    /// Opens a durable store backed by the single log file at `path`,
    /// recovering any bindings persisted by earlier sessions.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let (log, bindings) = StoreLog::open(path)?;
        info!(
            path = %log.path().display(),
            handles = bindings.len(),
            "handle store opened"
        );
        Ok(Self {
            bindings: RwLock::new(bindings),
            log: Some(log),
        })
    }

    /// Returns true if this store persists to disk.
    pub fn is_durable(&self) -> bool {
        self.log.is_some()
    }

    /// Mints a fresh unique token, persists the binding, and returns the
    /// token.
    pub fn create(&self, table: Table) -> StoreResult<Handle> {
        let handle = Handle::mint();
        self.persist(&handle, table)?;
        debug!(handle = %handle, "created handle");
        debug_assert!(self.verify(&handle).unwrap_or(false));
        Ok(handle)
    }

    /// Resolves a token to its bound table. Unknown tokens yield
    /// `Ok(None)`; callers branch rather than catch.
    pub fn resolve(&self, handle: &Handle) -> StoreResult<Option<Table>> {
        let bindings = self.bindings.read();
        let table = bindings.get(handle.as_str()).cloned();
        if table.is_none() {
            debug!(
                handle = %handle,
                known = bindings.len(),
                "handle not found in store"
            );
        }
        Ok(table)
    }

    /// Overwrites the binding for an existing token in place. An unknown
    /// token behaves as a fresh create under the given token.
    pub fn rebind(&self, handle: &Handle, table: Table) -> StoreResult<()> {
        self.persist(handle, table)?;
        debug!(handle = %handle, "rebound handle");
        debug_assert!(self.verify(handle).unwrap_or(false));
        Ok(())
    }

    /// Enumerates all known tokens. Diagnostic use only.
    pub fn list_tokens(&self) -> Vec<Handle> {
        self.bindings
            .read()
            .keys()
            .map(|t| Handle::from_token(t.clone()))
            .collect()
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// Returns true if the store holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    /// Post-write consistency check: re-reads the handle and confirms a
    /// binding exists (and, for durable stores, that the in-memory value
    /// round-trips through the serialized form). Used by tests and debug
    /// assertions, not on the production write path.
    pub fn verify(&self, handle: &Handle) -> StoreResult<bool> {
        let bindings = self.bindings.read();
        let Some(table) = bindings.get(handle.as_str()) else {
            return Ok(false);
        };
        if self.log.is_none() {
            return Ok(true);
        }
        let encoded = match bincode::serialize(table) {
            Ok(b) => b,
            Err(_) => return Ok(false),
        };
        let decoded: Table = match bincode::deserialize(&encoded) {
            Ok(t) => t,
            Err(_) => return Ok(false),
        };
        Ok(&decoded == table)
    }

    /// Rewrites the durable log to drop superseded rebind records.
    /// No-op for memory-only stores.
    pub fn compact(&self) -> StoreResult<()> {
        if let Some(log) = &self.log {
            let bindings = self.bindings.read();
            log.compact(&bindings)?;
            info!(handles = bindings.len(), "store log compacted");
        }
        Ok(())
    }

    /// Writes the binding: log first (when durable), then the map, under
    /// the write lock so a rebind is atomic per token.
    fn persist(&self, handle: &Handle, table: Table) -> StoreResult<()> {
        let mut bindings = self.bindings.write();
        if let Some(log) = &self.log {
            log.append(handle.as_str(), &table)?;
        }
        bindings.insert(handle.as_str().to_string(), table);
        Ok(())
    }
}
