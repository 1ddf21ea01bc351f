//! # State Store Bridge
//!
//! Adapts `qc-04-state-management`'s synchronous [`StateStoreApi`] to
//! `qc-11-smart-contracts`'s async [`StateAccess`] port, so the Execution
//! Engine can read state without either crate depending on the other
//! directly (spec.md §9's cyclic-reference note — `qc-08-consensus` is the
//! only crate that imports both).
//!
//! Writes made through `StateAccess::set_storage` are queued in an overlay
//! rather than applied immediately, matching that trait's own doc comment
//! ("actual application happens on commit"). `ConsensusIntegration` flushes
//! the overlay into the State Store once a transaction's `ExecutionResult`
//! has been accepted, via [`StateStoreBridge::commit`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use qc_04_state_management::domain::entities::{ContractState, StateChange as StoreStateChange};
use qc_04_state_management::domain::value_objects::{Address as StoreAddress, Hash as StoreHash};
use qc_04_state_management::ports::api::StateStoreApi;
use qc_11_smart_contracts::domain::entities::AccountState;
use qc_11_smart_contracts::domain::value_objects::{
    Address, Bytes, Hash, StorageKey, StorageValue, U256,
};
use qc_11_smart_contracts::errors::StateError;
use qc_11_smart_contracts::ports::outbound::StateAccess;

fn to_store_address(address: Address) -> StoreAddress {
    StoreAddress::new(address.0)
}

fn to_store_hash(hash: [u8; 32]) -> StoreHash {
    StoreHash::new(hash)
}

fn from_store_hash(hash: StoreHash) -> Hash {
    Hash(hash.0)
}

/// Reads a big-endian byte string into a 32-byte word, right-aligned. A
/// slice longer than 32 bytes is truncated to its low-order 32 bytes — the
/// State Store's balance/storage encoding is unbounded in principle but
/// never produces values wider than a word in practice.
fn bytes_to_word(bytes: &[u8]) -> [u8; 32] {
    let mut word = [0u8; 32];
    if bytes.len() >= 32 {
        word.copy_from_slice(&bytes[bytes.len() - 32..]);
    } else {
        word[32 - bytes.len()..].copy_from_slice(bytes);
    }
    word
}

fn contract_state_to_account(state: &ContractState) -> AccountState {
    AccountState {
        balance: U256::from_big_endian(&bytes_to_word(&state.balance)),
        nonce: state.nonce,
        code_hash: from_store_hash(state.code_hash),
        storage_root: from_store_hash(state.storage_root),
    }
}

fn map_store_error(address: StoreAddress, err: qc_04_state_management::domain::errors::StateError) -> StateError {
    use qc_04_state_management::domain::errors::StateError as StoreError;
    match err {
        StoreError::ContractNotFound(_) => StateError::NotFound(Address(address.0)),
        other => StateError::Other(other.to_string()),
    }
}

/// A pending write queued against `(address, key)`, carrying the value the
/// slot held before this bridge first touched it this block so a commit can
/// populate `StateChange::Storage { old, new }` precisely.
struct PendingWrite {
    old: Option<Vec<u8>>,
    new: Vec<u8>,
}

/// Bridges a `StateStoreApi` handle into the `StateAccess` the Execution
/// Engine expects, buffering writes until [`commit_address`](Self::commit_address).
///
/// Cloning shares the same overlay (`Arc`-backed): `ConsensusIntegration`
/// keeps one clone to call `commit_address`/`rollback` directly while
/// handing another to the `ExecutionEngine` it drives, so both see the same
/// pending writes.
pub struct StateStoreBridge<ST: StateStoreApi> {
    store: Arc<ST>,
    pending: Arc<RwLock<HashMap<StoreAddress, HashMap<StoreHash, PendingWrite>>>>,
}

impl<ST: StateStoreApi> Clone for StateStoreBridge<ST> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<ST: StateStoreApi> StateStoreBridge<ST> {
    #[must_use]
    pub fn new(store: Arc<ST>) -> Self {
        Self {
            store,
            pending: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Flushes every queued write for `address` into the State Store as a
    /// single `update_contract_state` call under `block_number`, clearing
    /// the overlay for that address on success, and returns the exact
    /// [`StoreStateChange`]s applied (so a caller can derive an inverse for
    /// later rollback). A failed flush leaves the State Store untouched
    /// (spec.md §4.2's atomic-update guarantee) and the overlay for
    /// `address` is left queued so a retry is possible.
    pub fn commit_address_with_changes(
        &self,
        address: StoreAddress,
        block_number: u64,
    ) -> Result<Vec<StoreStateChange>, qc_04_state_management::domain::errors::StateError> {
        let writes = {
            let mut pending = self.pending.write();
            match pending.remove(&address) {
                Some(writes) if !writes.is_empty() => writes,
                _ => return Ok(Vec::new()),
            }
        };

        let changes: Vec<StoreStateChange> = writes
            .into_iter()
            .map(|(key, write)| StoreStateChange::Storage {
                key,
                old: write.old.unwrap_or_default(),
                new: write.new,
            })
            .collect();

        self.store
            .update_contract_state(address, changes.clone(), block_number)?;
        Ok(changes)
    }

    /// Convenience wrapper over [`commit_address_with_changes`] for callers
    /// that don't need the applied change list.
    pub fn commit_address(
        &self,
        address: StoreAddress,
        block_number: u64,
    ) -> Result<(), qc_04_state_management::domain::errors::StateError> {
        self.commit_address_with_changes(address, block_number).map(|_| ())
    }

    /// Flushes every address with pending writes, returning the first error
    /// encountered (if any) after attempting every address — a single bad
    /// address should not hide failures in the rest of the block.
    pub fn commit_all(
        &self,
        block_number: u64,
    ) -> Result<(), qc_04_state_management::domain::errors::StateError> {
        let addresses: Vec<StoreAddress> = self.pending.read().keys().copied().collect();
        let mut first_err = None;
        for address in addresses {
            if let Err(err) = self.commit_address(address, block_number) {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Discards every queued write without touching the State Store.
    pub fn rollback(&self) {
        self.pending.write().clear();
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ST> {
        &self.store
    }
}

#[async_trait]
impl<ST: StateStoreApi> StateAccess for StateStoreBridge<ST> {
    async fn get_account(&self, address: Address) -> Result<Option<AccountState>, StateError> {
        let store_address = to_store_address(address);
        let state = self
            .store
            .get_contract_state(store_address)
            .map_err(|err| map_store_error(store_address, err))?;
        Ok(state.as_ref().map(contract_state_to_account))
    }

    async fn get_storage(&self, address: Address, key: StorageKey) -> Result<StorageValue, StateError> {
        let store_address = to_store_address(address);
        let store_key = to_store_hash(key.0);

        if let Some(pending) = self.pending.read().get(&store_address) {
            if let Some(write) = pending.get(&store_key) {
                return Ok(StorageValue(bytes_to_word(&write.new)));
            }
        }

        let value = self
            .store
            .get_storage_value(store_address, store_key)
            .map_err(|err| map_store_error(store_address, err))?;
        Ok(match value {
            Some(bytes) => StorageValue(bytes_to_word(&bytes)),
            None => StorageValue::ZERO,
        })
    }

    async fn set_storage(
        &self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError> {
        let store_address = to_store_address(address);
        let store_key = to_store_hash(key.0);

        let baseline = self
            .store
            .get_storage_value(store_address, store_key)
            .map_err(|err| map_store_error(store_address, err))?;

        let mut pending = self.pending.write();
        let entry = pending
            .entry(store_address)
            .or_default()
            .entry(store_key)
            .or_insert_with(|| PendingWrite {
                old: baseline,
                new: Vec::new(),
            });
        entry.new = value.0.to_vec();
        Ok(())
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, StateError> {
        let store_address = to_store_address(address);
        let state = self
            .store
            .get_contract_state(store_address)
            .map_err(|err| map_store_error(store_address, err))?;
        Ok(Bytes(state.map(|s| s.code).unwrap_or_default()))
    }

    async fn account_exists(&self, address: Address) -> Result<bool, StateError> {
        let store_address = to_store_address(address);
        let state = self
            .store
            .get_contract_state(store_address)
            .map_err(|err| map_store_error(store_address, err))?;
        Ok(state.is_some())
    }
}

#[cfg(test)]
mod tests {
    use qc_04_state_management::domain::store::{ContractKind, StateStore};
    use qc_04_state_management::domain::value_objects::Address as StoreAddress;

    use super::*;

    fn qc11_address(store: StoreAddress) -> Address {
        Address(store.0)
    }

    #[tokio::test]
    async fn reads_through_to_missing_account() {
        let store = Arc::new(StateStore::new(Default::default()));
        let bridge = StateStoreBridge::new(store);
        let account = bridge.get_account(Address([9u8; 20])).await.unwrap();
        assert!(account.is_none());
    }

    #[tokio::test]
    async fn queued_write_is_visible_before_commit_but_not_in_store() {
        let store_address = StoreAddress::new([3u8; 20]);
        let store = Arc::new(StateStore::new(Default::default()));
        store
            .create_contract(store_address, vec![0x60, 0x00], StoreAddress::new([1u8; 20]), ContractKind::Standard)
            .unwrap();
        let bridge = StateStoreBridge::new(store.clone());

        let key = StorageKey([7u8; 32]);
        bridge
            .set_storage(qc11_address(store_address), key, StorageValue([1u8; 32]))
            .await
            .unwrap();

        let seen = bridge.get_storage(qc11_address(store_address), key).await.unwrap();
        assert_eq!(seen, StorageValue([1u8; 32]));
        assert!(store.get_storage_value(store_address, StoreHash::new([7u8; 32])).unwrap().is_none());

        bridge.commit_address(store_address, 1).unwrap();
        let stored = store
            .get_storage_value(store_address, StoreHash::new([7u8; 32]))
            .unwrap();
        assert_eq!(stored, Some(vec![1u8; 32]));
    }

    #[tokio::test]
    async fn rollback_discards_queued_writes() {
        let store_address = StoreAddress::new([4u8; 20]);
        let store = Arc::new(StateStore::new(Default::default()));
        store
            .create_contract(store_address, vec![0x60, 0x00], StoreAddress::new([1u8; 20]), ContractKind::Standard)
            .unwrap();
        let bridge = StateStoreBridge::new(store);

        let key = StorageKey([8u8; 32]);
        bridge
            .set_storage(qc11_address(store_address), key, StorageValue([2u8; 32]))
            .await
            .unwrap();
        bridge.rollback();

        let seen = bridge.get_storage(qc11_address(store_address), key).await.unwrap();
        assert_eq!(seen, StorageValue::ZERO);
    }
}
