//! # Registry Host Adapter
//!
//! Implements the [`Host`] port directly over the crate's own
//! [`ContractRegistry`], so the interpreter's `CREATE`/`CREATE2`/
//! `SELFDESTRUCT` dispatch can register and schedule-destroy contracts
//! without depending on the registry's concrete (synchronous) API.

use std::sync::Arc;

use crate::domain::registry::{Contract, ContractRegistry};
use crate::domain::value_objects::Address;
use crate::ports::outbound::Host;
use async_trait::async_trait;

#[async_trait]
impl Host for ContractRegistry {
    async fn register_contract(&self, contract: Contract) -> bool {
        self.register(contract).is_ok()
    }

    async fn contract_exists(&self, address: Address) -> bool {
        self.contains(address)
    }

    async fn schedule_destroy(&self, address: Address) {
        self.schedule_destroy(address);
    }
}

/// Lets an `Arc<ContractRegistry>` stand in for `H: Host` directly, so a
/// caller building an [`ExecutionEngine`](crate::service::ExecutionEngine)
/// can keep its own `Arc<ContractRegistry>` handle (e.g. for direct
/// registry queries) while handing the engine a shared, not cloned, copy.
#[async_trait]
impl Host for Arc<ContractRegistry> {
    async fn register_contract(&self, contract: Contract) -> bool {
        self.as_ref().register(contract).is_ok()
    }

    async fn contract_exists(&self, address: Address) -> bool {
        self.as_ref().contains(address)
    }

    async fn schedule_destroy(&self, address: Address) {
        self.as_ref().schedule_destroy(address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Hash;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    #[tokio::test]
    async fn register_contract_via_host_trait() {
        let registry = ContractRegistry::new();
        let contract = Contract {
            address: addr(1),
            code: vec![0x00],
            code_hash: Hash::new([0u8; 32]),
            creator: addr(2),
            creation_block: 0,
        };

        assert!(Host::register_contract(&registry, contract.clone()).await);
        assert!(Host::contract_exists(&registry, addr(1)).await);
        assert!(!Host::register_contract(&registry, contract).await);
    }
}
