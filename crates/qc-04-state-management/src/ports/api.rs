//! # Inbound API Ports
//!
//! The public-facing contracts for the State Store and Storage Adapter
//! (spec.md §4.2/§4.3), kept as traits so the Consensus Integration crate
//! can depend on the interface rather than the concrete types.

use crate::domain::entities::{ContractState, StateChange, StateSnapshot};
use crate::domain::errors::StateError;
use crate::domain::store::ContractKind;
use crate::domain::value_objects::{Address, Hash};

/// Driven-side contract for the State Store (spec.md §4.2).
pub trait StateStoreApi: Send + Sync {
    fn create_contract(
        &self,
        address: Address,
        code: Vec<u8>,
        creator: Address,
        kind: ContractKind,
    ) -> Result<(), StateError>;

    fn get_contract_state(&self, address: Address) -> Result<Option<ContractState>, StateError>;

    fn update_contract_state(
        &self,
        address: Address,
        changes: Vec<StateChange>,
        block_number: u64,
    ) -> Result<(), StateError>;

    fn get_storage_value(&self, address: Address, key: Hash) -> Result<Option<Vec<u8>>, StateError>;

    fn set_storage_value(
        &self,
        address: Address,
        key: Hash,
        value: Option<Vec<u8>>,
    ) -> Result<(), StateError>;

    fn get_state_history(&self, address: Address, limit: usize) -> Result<Vec<StateSnapshot>, StateError>;

    fn prune_state_history(&self, address: Address, keep_count: usize) -> Result<(), StateError>;
}

impl StateStoreApi for crate::domain::store::StateStore {
    fn create_contract(
        &self,
        address: Address,
        code: Vec<u8>,
        creator: Address,
        kind: ContractKind,
    ) -> Result<(), StateError> {
        crate::domain::store::StateStore::create_contract(self, address, code, creator, kind)
    }

    fn get_contract_state(&self, address: Address) -> Result<Option<ContractState>, StateError> {
        crate::domain::store::StateStore::get_contract_state(self, address)
    }

    fn update_contract_state(
        &self,
        address: Address,
        changes: Vec<StateChange>,
        block_number: u64,
    ) -> Result<(), StateError> {
        crate::domain::store::StateStore::update_contract_state(self, address, changes, block_number)
    }

    fn get_storage_value(&self, address: Address, key: Hash) -> Result<Option<Vec<u8>>, StateError> {
        crate::domain::store::StateStore::get_storage_value(self, address, key)
    }

    fn set_storage_value(
        &self,
        address: Address,
        key: Hash,
        value: Option<Vec<u8>>,
    ) -> Result<(), StateError> {
        crate::domain::store::StateStore::set_storage_value(self, address, key, value)
    }

    fn get_state_history(&self, address: Address, limit: usize) -> Result<Vec<StateSnapshot>, StateError> {
        crate::domain::store::StateStore::get_state_history(self, address, limit)
    }

    fn prune_state_history(&self, address: Address, keep_count: usize) -> Result<(), StateError> {
        crate::domain::store::StateStore::prune_state_history(self, address, keep_count)
    }
}

/// Driven-side contract for the Storage Adapter (spec.md §4.3).
pub trait StorageAdapterApi: Send + Sync {
    fn get(&self, address: Address, key: Hash) -> Result<Option<Vec<u8>>, StateError>;
    fn set(&self, address: Address, key: Hash, value: Vec<u8>) -> Result<(), StateError>;
    fn delete(&self, address: Address, key: Hash) -> Result<(), StateError>;
    fn get_contract_storage(&self, address: Address) -> Result<Vec<(Hash, Vec<u8>)>, StateError>;
    fn clear_contract_storage(&self, address: Address) -> Result<(), StateError>;
    fn commit(&self) -> Result<(), StateError>;
    fn rollback(&self) -> Result<(), StateError>;
}
