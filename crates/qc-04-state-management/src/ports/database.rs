//! # Key-Value Backend Port
//!
//! The flat, address-agnostic store the [`StorageAdapter`](crate::domain::storage_adapter::StorageAdapter)
//! layers its cache/pending/deleted overlay on top of (spec.md §4.3/§6).

use crate::domain::errors::StateError;

/// A flat byte-string key-value backend.
///
/// Keys are opaque to the backend; the Storage Adapter is responsible for
/// the `"<address-hex>:<hash-hex>"` scoping scheme (spec.md §6) and for
/// prefix construction passed to [`KvBackend::keys_with_prefix`].
pub trait KvBackend: Send + Sync {
    /// Reads the value at `key`, or `None` if absent.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StateError>;

    /// Writes `value` at `key`, overwriting any existing value.
    fn write(&self, key: &str, value: Vec<u8>) -> Result<(), StateError>;

    /// Removes `key`. A no-op (not an error) if the key is already absent.
    fn delete(&self, key: &str) -> Result<(), StateError>;

    /// Returns whether `key` is present.
    fn has(&self, key: &str) -> Result<bool, StateError>;

    /// Returns every key currently stored with the given prefix, used by
    /// the Storage Adapter's prefix-iteration operations
    /// (`GetContractStorage`/`ClearContractStorage`, spec.md §4.3).
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StateError>;

    /// Flushes and releases any resources held by the backend. A no-op for
    /// purely in-memory backends.
    fn close(&self) -> Result<(), StateError> {
        Ok(())
    }
}
