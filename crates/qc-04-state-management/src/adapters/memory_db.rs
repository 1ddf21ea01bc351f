//! In-memory [`KvBackend`], used by tests and by embedders that don't need
//! persistence across restarts.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::errors::StateError;
use crate::ports::database::KvBackend;

/// A `HashMap`-backed [`KvBackend`] guarded by a single `RwLock`.
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for InMemoryKvStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        let entries = self.entries.read().map_err(|_| StateError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
        let mut entries = self.entries.write().map_err(|_| StateError::LockPoisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StateError> {
        let mut entries = self.entries.write().map_err(|_| StateError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, StateError> {
        let entries = self.entries.read().map_err(|_| StateError::LockPoisoned)?;
        Ok(entries.contains_key(key))
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StateError> {
        let entries = self.entries.read().map_err(|_| StateError::LockPoisoned)?;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_delete_roundtrip() {
        let db = InMemoryKvStore::new();
        db.write("a", vec![1, 2, 3]).unwrap();
        assert_eq!(db.read("a").unwrap(), Some(vec![1, 2, 3]));
        assert!(db.has("a").unwrap());

        db.delete("a").unwrap();
        assert_eq!(db.read("a").unwrap(), None);
        assert!(!db.has("a").unwrap());
    }

    #[test]
    fn keys_with_prefix_filters_correctly() {
        let db = InMemoryKvStore::new();
        db.write("addr1:key1", vec![1]).unwrap();
        db.write("addr1:key2", vec![2]).unwrap();
        db.write("addr2:key1", vec![9]).unwrap();

        let mut keys = db.keys_with_prefix("addr1:").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["addr1:key1".to_string(), "addr1:key2".to_string()]);
    }
}
