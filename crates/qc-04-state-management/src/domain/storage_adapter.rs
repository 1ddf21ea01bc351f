//! # Storage Adapter
//!
//! A cache/pending/deleted overlay over a flat [`KvBackend`], scoped by
//! address so the per-contract storage maps the Execution Engine reads and
//! writes never collide across contracts (spec.md §4.3/§6).
//!
//! ## Overlay read order
//!
//! `deleted` (tombstone, wins outright) → `pending` (uncommitted write) →
//! `cache` (last known backend value) → `backend` (authoritative, and
//! populates `cache` on a hit).
//!
//! ## Commit discipline
//!
//! `commit()` is terminal: once called, `pending`/`deleted` are flushed to
//! the backend and further writes go straight through. `rollback()` is only
//! valid pre-commit and discards the overlay.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::errors::StateError;
use crate::domain::value_objects::{Address, Hash};
use crate::ports::database::KvBackend;

fn scoped_key(address: Address, key: Hash) -> String {
    format!("{}:{}", address.to_hex(), key.to_hex())
}

fn address_prefix(address: Address) -> String {
    format!("{}:", address.to_hex())
}

/// Splits a scoped key back into its hash suffix, given the address prefix
/// was already confirmed to match.
fn strip_prefix_to_hash(scoped: &str, prefix_len: usize) -> Option<Hash> {
    let suffix = scoped.get(prefix_len..)?;
    let bytes = hex::decode(suffix).ok()?;
    Hash::from_slice(&bytes)
}

/// The Storage Adapter (spec.md §4.3): a transactional overlay over a
/// [`KvBackend`], exposing scoped per-contract storage reads/writes.
pub struct StorageAdapter<B: KvBackend> {
    backend: Arc<B>,
    cache: RwLock<std::collections::HashMap<String, Vec<u8>>>,
    pending: RwLock<std::collections::HashMap<String, Vec<u8>>>,
    deleted: RwLock<HashSet<String>>,
    committed: AtomicBool,
}

impl<B: KvBackend> StorageAdapter<B> {
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            cache: RwLock::new(std::collections::HashMap::new()),
            pending: RwLock::new(std::collections::HashMap::new()),
            deleted: RwLock::new(HashSet::new()),
            committed: AtomicBool::new(false),
        }
    }

    /// Reads the current value at `(address, key)`, applying the overlay.
    pub fn get(&self, address: Address, key: Hash) -> Result<Option<Vec<u8>>, StateError> {
        let scoped = scoped_key(address, key);

        if self
            .deleted
            .read()
            .map_err(|_| StateError::LockPoisoned)?
            .contains(&scoped)
        {
            return Ok(None);
        }
        if let Some(v) = self
            .pending
            .read()
            .map_err(|_| StateError::LockPoisoned)?
            .get(&scoped)
        {
            return Ok(Some(v.clone()));
        }
        if let Some(v) = self
            .cache
            .read()
            .map_err(|_| StateError::LockPoisoned)?
            .get(&scoped)
        {
            return Ok(Some(v.clone()));
        }
        match self.backend.read(&scoped)? {
            Some(v) => {
                self.cache
                    .write()
                    .map_err(|_| StateError::LockPoisoned)?
                    .insert(scoped, v.clone());
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }

    /// Stages a write at `(address, key)`. Visible to `get` immediately;
    /// only durable in the backend after `commit()`.
    pub fn set(&self, address: Address, key: Hash, value: Vec<u8>) -> Result<(), StateError> {
        let scoped = scoped_key(address, key);
        self.deleted
            .write()
            .map_err(|_| StateError::LockPoisoned)?
            .remove(&scoped);
        self.pending
            .write()
            .map_err(|_| StateError::LockPoisoned)?
            .insert(scoped, value);
        Ok(())
    }

    /// Stages a deletion at `(address, key)`.
    pub fn delete(&self, address: Address, key: Hash) -> Result<(), StateError> {
        let scoped = scoped_key(address, key);
        self.pending
            .write()
            .map_err(|_| StateError::LockPoisoned)?
            .remove(&scoped);
        self.deleted
            .write()
            .map_err(|_| StateError::LockPoisoned)?
            .insert(scoped);
        Ok(())
    }

    /// Returns every live `(key, value)` pair for `address`, merging the
    /// backend's committed entries with the pending overlay and honoring
    /// tombstones (spec.md §6's "prefix iteration by address").
    pub fn get_contract_storage(&self, address: Address) -> Result<Vec<(Hash, Vec<u8>)>, StateError> {
        let prefix = address_prefix(address);
        let mut merged: std::collections::HashMap<String, Vec<u8>> = std::collections::HashMap::new();

        for scoped in self.backend.keys_with_prefix(&prefix)? {
            if let Some(v) = self.backend.read(&scoped)? {
                merged.insert(scoped, v);
            }
        }
        for (scoped, v) in self
            .pending
            .read()
            .map_err(|_| StateError::LockPoisoned)?
            .iter()
        {
            if scoped.starts_with(&prefix) {
                merged.insert(scoped.clone(), v.clone());
            }
        }
        let deleted = self.deleted.read().map_err(|_| StateError::LockPoisoned)?;
        merged.retain(|k, _| !deleted.contains(k));

        let mut out = Vec::with_capacity(merged.len());
        for (scoped, v) in merged {
            if let Some(key) = strip_prefix_to_hash(&scoped, prefix.len()) {
                out.push((key, v));
            }
        }
        Ok(out)
    }

    /// Stages a tombstone for every currently-live key under `address`.
    pub fn clear_contract_storage(&self, address: Address) -> Result<(), StateError> {
        for (key, _) in self.get_contract_storage(address)? {
            self.delete(address, key)?;
        }
        Ok(())
    }

    /// Flushes the overlay into the backend. Terminal: a second call
    /// returns `StorageError` rather than silently no-op-ing, since a
    /// caller committing twice almost always indicates a logic error in
    /// the surrounding transaction boundary.
    pub fn commit(&self) -> Result<(), StateError> {
        if self.committed.swap(true, Ordering::SeqCst) {
            return Err(StateError::StorageError(
                "storage adapter already committed".to_string(),
            ));
        }
        let pending = std::mem::take(
            &mut *self.pending.write().map_err(|_| StateError::LockPoisoned)?,
        );
        let deleted = std::mem::take(
            &mut *self.deleted.write().map_err(|_| StateError::LockPoisoned)?,
        );
        for (key, value) in pending {
            self.backend.write(&key, value)?;
        }
        for key in deleted {
            self.backend.delete(&key)?;
        }
        Ok(())
    }

    /// Discards the overlay. Fails if `commit()` has already run.
    pub fn rollback(&self) -> Result<(), StateError> {
        if self.committed.load(Ordering::SeqCst) {
            return Err(StateError::StorageError(
                "cannot roll back a committed storage adapter".to_string(),
            ));
        }
        self.pending.write().map_err(|_| StateError::LockPoisoned)?.clear();
        self.deleted.write().map_err(|_| StateError::LockPoisoned)?.clear();
        Ok(())
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_db::InMemoryKvStore;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    fn key(n: u8) -> Hash {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        Hash::new(bytes)
    }

    #[test]
    fn write_then_read_before_commit() {
        let adapter = StorageAdapter::new(Arc::new(InMemoryKvStore::new()));
        adapter.set(addr(1), key(1), vec![42]).unwrap();
        assert_eq!(adapter.get(addr(1), key(1)).unwrap(), Some(vec![42]));
    }

    #[test]
    fn delete_masks_pending_and_backend() {
        let backend = Arc::new(InMemoryKvStore::new());
        backend.write("0000000000000000000000000000000000000001:0000000000000000000000000000000000000000000000000000000000000001", vec![1]).unwrap();
        let adapter = StorageAdapter::new(backend);
        adapter.delete(addr(1), key(1)).unwrap();
        assert_eq!(adapter.get(addr(1), key(1)).unwrap(), None);
    }

    #[test]
    fn commit_flushes_to_backend_and_is_terminal() {
        let backend = Arc::new(InMemoryKvStore::new());
        let adapter = StorageAdapter::new(Arc::clone(&backend));
        adapter.set(addr(1), key(1), vec![7]).unwrap();
        adapter.commit().unwrap();

        assert!(backend.has(&scoped_key(addr(1), key(1))).unwrap());
        assert!(adapter.commit().is_err());
        assert!(adapter.rollback().is_err());
    }

    #[test]
    fn rollback_discards_uncommitted_writes() {
        let adapter = StorageAdapter::new(Arc::new(InMemoryKvStore::new()));
        adapter.set(addr(1), key(1), vec![7]).unwrap();
        adapter.rollback().unwrap();
        assert_eq!(adapter.get(addr(1), key(1)).unwrap(), None);
    }

    #[test]
    fn prefix_iteration_scopes_to_address() {
        let adapter = StorageAdapter::new(Arc::new(InMemoryKvStore::new()));
        adapter.set(addr(1), key(1), vec![1]).unwrap();
        adapter.set(addr(1), key(2), vec![2]).unwrap();
        adapter.set(addr(2), key(1), vec![9]).unwrap();

        let mut storage = adapter.get_contract_storage(addr(1)).unwrap();
        storage.sort_by_key(|(k, _)| k.0);
        assert_eq!(storage, vec![(key(1), vec![1]), (key(2), vec![2])]);
    }

    #[test]
    fn clear_contract_storage_tombstones_every_key() {
        let adapter = StorageAdapter::new(Arc::new(InMemoryKvStore::new()));
        adapter.set(addr(1), key(1), vec![1]).unwrap();
        adapter.set(addr(1), key(2), vec![2]).unwrap();
        adapter.clear_contract_storage(addr(1)).unwrap();
        assert!(adapter.get_contract_storage(addr(1)).unwrap().is_empty());
    }
}
