//! # State Store / Storage Adapter Error Types
//!
//! Taxonomy drawn from spec.md §7 (the *State* and *Storage* kinds, plus the
//! validation kinds this crate itself raises).

use thiserror::Error;

/// Errors raised by the State Store and Storage Adapter.
#[derive(Debug, Error, Clone)]
pub enum StateError {
    /// `CreateContract` for an address that already has a `ContractState`.
    #[error("contract already exists at {0}")]
    ContractAlreadyExists(String),

    /// A query targeted an address with no recorded state.
    #[error("contract not found: {0}")]
    ContractNotFound(String),

    /// `CreateContract` was called with empty code.
    #[error("invalid code: {0}")]
    InvalidCode(String),

    /// A hex string failed to parse as a 20-byte address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A hex string failed to parse as a 32-byte hash.
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// `applyStateChange` rejected a change (e.g. malformed encoding).
    #[error("invalid state change: {0}")]
    InvalidStateChange(String),

    /// A state invariant was violated (non-monotonic version, corrupt
    /// snapshot ordering, etc).
    #[error("state validation failed: {0}")]
    StateValidationFailed(String),

    /// The backing data was found to be internally inconsistent.
    #[error("state corruption detected: {0}")]
    StateCorruption(String),

    /// The key-value backend rejected a read/write/delete, or a write was
    /// attempted on an adapter past its commit point.
    #[error("storage error: {0}")]
    StorageError(String),

    /// The key-value backend refused a write due to capacity.
    #[error("storage full")]
    StorageFull,

    /// A `RwLock` guarding a stateful manager was poisoned by a prior panic.
    #[error("state lock poisoned")]
    LockPoisoned,
}
