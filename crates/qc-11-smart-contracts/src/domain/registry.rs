//! # Contract Registry
//!
//! The minimal address-to-contract bookkeeping `Deploy` and the `CREATE`/
//! `CREATE2` opcodes need: existence checks plus code-hash and creator
//! secondary indexes. A heavier, externally-facing contract directory with
//! its own persistence and query surface is out of scope; this is purely the
//! in-core index the Execution Engine consults and updates.

use crate::domain::value_objects::{Address, Hash};
use std::collections::HashMap;
use std::sync::RwLock;

/// An immutable, on-chain contract record.
///
/// Invariants: `code_hash == keccak256(code)`, `address` is non-zero, `code`
/// is non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contract {
    /// Contract address.
    pub address: Address,
    /// Immutable bytecode (set once, at deploy time).
    pub code: Vec<u8>,
    /// `keccak256(code)`.
    pub code_hash: Hash,
    /// Address that deployed this contract (via CREATE/CREATE2 or a
    /// top-level `Deploy` call).
    pub creator: Address,
    /// Block number this contract was created at.
    pub creation_block: u64,
}

/// In-core address -> [`Contract`] index with code-hash and creator
/// secondary indexes, guarded by a single reader-writer lock per the
/// crate's locking idiom (one `RwLock` per stateful manager, writer lock
/// for mutation, reader lock + deep copy for queries).
#[derive(Debug, Default)]
pub struct ContractRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_address: HashMap<Address, Contract>,
    by_code_hash: HashMap<Hash, Vec<Address>>,
    by_creator: HashMap<Address, Vec<Address>>,
    /// Addresses whose SELFDESTRUCT has been recorded this block but not
    /// yet applied; removal is deferred to end-of-block per the spec's
    /// Open Question resolution (see DESIGN.md).
    pending_destruction: Vec<Address>,
}

/// Errors returned by [`ContractRegistry`] operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// `register` was called for an address that already has a contract.
    #[error("contract already exists at address: {0:?}")]
    ContractAlreadyExists(Address),
}

impl ContractRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly deployed contract.
    ///
    /// Fails with [`RegistryError::ContractAlreadyExists`] if the address is
    /// already registered; callers are responsible for generating a unique
    /// address beforehand (nonce/salt uniqueness, per spec.md §4.1).
    pub fn register(&self, contract: Contract) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if inner.by_address.contains_key(&contract.address) {
            return Err(RegistryError::ContractAlreadyExists(contract.address));
        }
        inner
            .by_code_hash
            .entry(contract.code_hash)
            .or_default()
            .push(contract.address);
        inner
            .by_creator
            .entry(contract.creator)
            .or_default()
            .push(contract.address);
        inner.by_address.insert(contract.address, contract);
        Ok(())
    }

    /// Returns a deep copy of the contract at `address`, if registered.
    #[must_use]
    pub fn get(&self, address: Address) -> Option<Contract> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .by_address
            .get(&address)
            .cloned()
    }

    /// Returns whether `address` currently has a registered contract.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .by_address
            .contains_key(&address)
    }

    /// Returns every address whose code hashes to `code_hash`.
    #[must_use]
    pub fn addresses_by_code_hash(&self, code_hash: Hash) -> Vec<Address> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .by_code_hash
            .get(&code_hash)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every contract address created by `creator`.
    #[must_use]
    pub fn addresses_by_creator(&self, creator: Address) -> Vec<Address> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .by_creator
            .get(&creator)
            .cloned()
            .unwrap_or_default()
    }

    /// Records `address` for deferred removal (SELFDESTRUCT), without
    /// removing it yet. The caller (the Consensus Integration's
    /// `process_block`) applies the removal after the whole block commits.
    pub fn schedule_destroy(&self, address: Address) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if !inner.pending_destruction.contains(&address) {
            inner.pending_destruction.push(address);
        }
    }

    /// Returns the addresses scheduled for destruction, without clearing
    /// the schedule.
    #[must_use]
    pub fn pending_destructions(&self) -> Vec<Address> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .pending_destruction
            .clone()
    }

    /// Applies every scheduled destruction: removes the contract from the
    /// primary and secondary indexes and clears the schedule. Called once,
    /// at end-of-block.
    pub fn apply_pending_destructions(&self) -> Vec<Address> {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let addresses = std::mem::take(&mut inner.pending_destruction);
        for address in &addresses {
            if let Some(contract) = inner.by_address.remove(address) {
                if let Some(list) = inner.by_code_hash.get_mut(&contract.code_hash) {
                    list.retain(|a| a != address);
                }
                if let Some(list) = inner.by_creator.get_mut(&contract.creator) {
                    list.retain(|a| a != address);
                }
            }
        }
        addresses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    fn hash(n: u8) -> Hash {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        Hash::new(bytes)
    }

    fn sample_contract(address: Address, creator: Address) -> Contract {
        Contract {
            address,
            code: vec![0x00],
            code_hash: hash(1),
            creator,
            creation_block: 0,
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let registry = ContractRegistry::new();
        let contract = sample_contract(addr(1), addr(2));
        registry.register(contract.clone()).unwrap();

        let fetched = registry.get(addr(1)).unwrap();
        assert_eq!(fetched, contract);
    }

    #[test]
    fn register_duplicate_address_fails() {
        let registry = ContractRegistry::new();
        registry.register(sample_contract(addr(1), addr(2))).unwrap();

        let err = registry.register(sample_contract(addr(1), addr(3))).unwrap_err();
        assert!(matches!(err, RegistryError::ContractAlreadyExists(a) if a == addr(1)));
    }

    #[test]
    fn secondary_indexes_track_code_hash_and_creator() {
        let registry = ContractRegistry::new();
        registry.register(sample_contract(addr(1), addr(9))).unwrap();
        registry.register(sample_contract(addr(2), addr(9))).unwrap();

        let by_hash = registry.addresses_by_code_hash(hash(1));
        assert_eq!(by_hash.len(), 2);

        let by_creator = registry.addresses_by_creator(addr(9));
        assert_eq!(by_creator.len(), 2);
    }

    #[test]
    fn destruction_is_deferred_until_applied() {
        let registry = ContractRegistry::new();
        registry.register(sample_contract(addr(1), addr(2))).unwrap();

        registry.schedule_destroy(addr(1));
        assert!(registry.contains(addr(1)));
        assert_eq!(registry.pending_destructions(), vec![addr(1)]);

        let removed = registry.apply_pending_destructions();
        assert_eq!(removed, vec![addr(1)]);
        assert!(!registry.contains(addr(1)));
    }
}
