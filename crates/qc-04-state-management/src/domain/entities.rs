//! # Domain Entities for the State Store
//!
//! Core data structures per spec.md §3 (Data Model) and §4.2 (State Store).

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::value_objects::{Address, Hash};

/// `keccak256(&[])`, the code hash for an account that has never had code
/// deployed to it.
pub const EMPTY_CODE_HASH: Hash = Hash([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// A contract's storage root with no entries.
pub const EMPTY_STORAGE_ROOT: Hash = Hash::ZERO;

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The authoritative per-contract state owned by the [`StateStore`](crate::domain::store::StateStore).
///
/// Invariants (spec.md §3): `version` strictly increases per accepted
/// update; `code` and `code_hash` mutate together; storage keys are
/// 32-byte hashes; an absent key is equivalent to an empty value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    /// Contract address.
    pub address: Address,
    /// Contract bytecode. Empty for an externally-owned account.
    pub code: Vec<u8>,
    /// `keccak256(code)`.
    pub code_hash: Hash,
    /// Arbitrary-precision balance, represented as a big-endian magnitude.
    pub balance: Vec<u8>,
    /// Transaction/call nonce.
    pub nonce: u64,
    /// Opaque commitment over the storage map (spec.md §4.2/§6).
    pub storage_root: Hash,
    /// Mapping from 32-byte storage key to an arbitrary-length value.
    /// An absent key is equivalent to an empty value.
    pub storage: HashMap<Hash, Vec<u8>>,
    /// Unix timestamp this state was first created.
    pub created_at: u64,
    /// Unix timestamp of the most recent accepted update.
    pub updated_at: u64,
    /// Monotonically increasing version, incremented on every accepted
    /// `UpdateContractState`.
    pub version: u64,
    /// Whether the contract is still live (false after a self-destruct has
    /// been applied).
    pub is_active: bool,
}

impl ContractState {
    /// Creates the initial state for a freshly deployed contract:
    /// balance=0, nonce=0, version=1, empty storage.
    #[must_use]
    pub fn new(address: Address, code: Vec<u8>, code_hash: Hash) -> Self {
        let now = now_unix();
        Self {
            address,
            code,
            code_hash,
            balance: Vec::new(),
            nonce: 0,
            storage_root: EMPTY_STORAGE_ROOT,
            storage: HashMap::new(),
            created_at: now,
            updated_at: now,
            version: 1,
            is_active: true,
        }
    }

    /// Returns the balance as an unsigned big integer, interpreting the
    /// stored big-endian byte string (spec.md §4.2's `applyStateChange`
    /// semantics for `Balance`).
    #[must_use]
    pub fn balance_u128(&self) -> u128 {
        bytes_be_to_u128(&self.balance)
    }

    /// Returns the balance as a `U256`, matching the Execution Engine's
    /// arbitrary-precision (up to 256 bits) `StateChange::Balance` values
    /// without truncating through `u128` (spec.md §3's "arbitrary-precision
    /// unsigned integer").
    #[must_use]
    pub fn balance_u256(&self) -> U256 {
        bytes_be_to_u256(&self.balance)
    }
}

/// Converts a big-endian byte string (as stored in [`ContractState::balance`])
/// to a `u128`, saturating if the magnitude is too large to represent.
#[must_use]
pub fn bytes_be_to_u128(bytes: &[u8]) -> u128 {
    if bytes.len() > 16 {
        return u128::MAX;
    }
    let mut buf = [0u8; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    u128::from_be_bytes(buf)
}

/// Converts a `u128` to its minimal big-endian byte representation (no
/// leading zero bytes), matching how [`ContractState::balance`] is stored.
#[must_use]
pub fn u128_to_bytes_be(value: u128) -> Vec<u8> {
    let full = value.to_be_bytes();
    let first_nonzero = full.iter().position(|&b| b != 0);
    match first_nonzero {
        Some(idx) => full[idx..].to_vec(),
        None => Vec::new(),
    }
}

/// Converts a big-endian byte string (as stored in [`ContractState::balance`])
/// to a `U256`, losslessly for any magnitude the Execution Engine can
/// produce (its `Word`/balance type is itself 256 bits wide).
#[must_use]
pub fn bytes_be_to_u256(bytes: &[u8]) -> U256 {
    let start = bytes.len().saturating_sub(32);
    U256::from_big_endian(&bytes[start..])
}

/// Converts a `U256` to its minimal big-endian byte representation (no
/// leading zero bytes), matching how [`ContractState::balance`] is stored.
#[must_use]
pub fn u256_to_bytes_be(value: U256) -> Vec<u8> {
    let mut full = [0u8; 32];
    value.to_big_endian(&mut full);
    let first_nonzero = full.iter().position(|&b| b != 0);
    match first_nonzero {
        Some(idx) => full[idx..].to_vec(),
        None => Vec::new(),
    }
}

/// A tagged state delta, applied atomically within a transaction (spec.md
/// §3's `StateChange`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// A single storage-slot write or deletion. `old` is the value
    /// immediately before this change; `new` is empty for a deletion.
    Storage { key: Hash, old: Vec<u8>, new: Vec<u8> },
    /// Sets the account balance to `new` (big-endian unsigned integer).
    Balance { new: Vec<u8> },
    /// Sets the account nonce to `new`, truncated to 64 bits
    /// (spec.md §4.2's `applyStateChange`).
    Nonce { new: u64 },
    /// Overwrites the contract's code and recomputes its code hash.
    Code { new: Vec<u8> },
    /// Reserved extension point. No-op per spec.md §4.2.
    Metadata { key: String, value: Vec<u8> },
}

/// A versioned record of a contract's state at a particular block, plus the
/// changes that produced it (spec.md §3's `StateSnapshot`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub block_number: u64,
    /// Opaque commitment over the post-change state (spec.md §4.2/§6).
    pub state_hash: Hash,
    pub timestamp: u64,
    pub changes: Vec<StateChange>,
}

impl StateSnapshot {
    #[must_use]
    pub fn initial(state_hash: Hash) -> Self {
        Self {
            block_number: 0,
            state_hash,
            timestamp: now_unix(),
            changes: Vec::new(),
        }
    }
}

/// Tunables for the State Store and Storage Adapter.
#[derive(Clone, Debug)]
pub struct StateConfig {
    /// Maximum snapshots retained per address (spec.md §3's
    /// `MaxHistorySize`). Oldest snapshots are pruned first.
    pub max_history_size: usize,
    /// Size, in megabytes, of the optional read-through account cache.
    pub cache_size_mb: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_history_size: 100,
            cache_size_mb: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_roundtrip() {
        let v = 123_456_789_u128;
        let bytes = u128_to_bytes_be(v);
        assert_eq!(bytes_be_to_u128(&bytes), v);
    }

    #[test]
    fn zero_balance_encodes_empty() {
        assert_eq!(u128_to_bytes_be(0), Vec::<u8>::new());
        assert_eq!(bytes_be_to_u128(&[]), 0);
    }

    #[test]
    fn balance_u256_roundtrip_beyond_u128_range() {
        let v = U256::MAX - U256::from(1u8);
        let bytes = u256_to_bytes_be(v);
        assert_eq!(bytes_be_to_u256(&bytes), v);

        let mut state = ContractState::new(Address::new([1u8; 20]), vec![0x00], Hash::ZERO);
        state.balance = bytes;
        assert_eq!(state.balance_u256(), v);
    }

    #[test]
    fn zero_balance_u256_encodes_empty() {
        assert_eq!(u256_to_bytes_be(U256::zero()), Vec::<u8>::new());
        assert_eq!(bytes_be_to_u256(&[]), U256::zero());
    }

    #[test]
    fn new_contract_state_defaults() {
        let state = ContractState::new(Address::new([1u8; 20]), vec![0x00], Hash::ZERO);
        assert_eq!(state.version, 1);
        assert_eq!(state.balance_u128(), 0);
        assert_eq!(state.nonce, 0);
        assert!(state.is_active);
        assert!(state.storage.is_empty());
    }
}
