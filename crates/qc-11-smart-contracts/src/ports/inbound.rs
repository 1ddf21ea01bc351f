//! # Driving Ports (API - Inbound)
//!
//! The public surface the Execution Engine exposes to its callers (the
//! Consensus Integration pipeline, or a direct test harness): execute a
//! call, deploy a contract, estimate gas, or run a static call.

use crate::domain::entities::{BlockContext, ExecutionResult};
use crate::domain::registry::Contract;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::VmError;
use async_trait::async_trait;

// =============================================================================
// SIGNED TRANSACTION (Re-exported for API use)
// =============================================================================

/// Signed transaction for execution.
///
/// Mirrors the fields a consensus-layer transaction carries, kept local to
/// avoid coupling the Execution Engine to a specific transaction-pool type.
#[derive(Clone, Debug)]
pub struct SignedTransaction {
    /// Sender address (20 bytes).
    pub from: Address,
    /// Recipient address (None for contract creation).
    pub to: Option<Address>,
    /// Transaction value in wei.
    pub value: U256,
    /// Sender's nonce.
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Transaction data (calldata or init code).
    pub data: Bytes,
    /// Transaction hash (computed from signed data).
    pub hash: Hash,
}

impl SignedTransaction {
    /// Returns true if this is a contract creation transaction.
    #[must_use]
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Returns the transaction hash.
    #[must_use]
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Returns the sender address.
    #[must_use]
    pub fn sender(&self) -> Address {
        self.from
    }
}

impl Default for SignedTransaction {
    fn default() -> Self {
        Self {
            from: Address::ZERO,
            to: None,
            value: U256::zero(),
            nonce: 0,
            gas_price: U256::from(1_000_000_000u64), // 1 gwei
            gas_limit: 21000,
            data: Bytes::new(),
            hash: Hash::ZERO,
        }
    }
}

// =============================================================================
// SMART CONTRACT API (Primary Driving Port)
// =============================================================================

/// Primary API for smart contract execution, matching
/// [`crate::service::ExecutionEngine`]'s inherent methods.
///
/// Consensus Integration depends on this trait (rather than the concrete
/// engine type) so it can be exercised against a test double.
#[async_trait]
pub trait SmartContractApi: Send + Sync {
    /// Executes a call against a deployed contract.
    async fn execute(
        &self,
        contract: Address,
        input: Bytes,
        gas_limit: u64,
        sender: Address,
        value: U256,
        block: &BlockContext,
    ) -> Result<ExecutionResult, VmError>;

    /// Deploys new code, registering the resulting contract on success.
    async fn deploy(
        &self,
        init_code: Bytes,
        constructor_args: Bytes,
        gas_limit: u64,
        sender: Address,
        value: U256,
        block: &BlockContext,
    ) -> Result<(Contract, ExecutionResult), VmError>;

    /// Estimates gas for a call without applying state changes.
    async fn estimate_gas(
        &self,
        contract: Address,
        input: Bytes,
        sender: Address,
        value: U256,
        block: &BlockContext,
    ) -> Result<u64, VmError>;

    /// Executes a read-only call (`eth_call`).
    async fn call(
        &self,
        contract: Address,
        input: Bytes,
        sender: Address,
        block: &BlockContext,
    ) -> Result<Bytes, VmError>;
}

#[async_trait]
impl<S, H> SmartContractApi for crate::service::ExecutionEngine<S, H>
where
    S: crate::ports::outbound::StateAccess,
    H: crate::ports::outbound::Host,
{
    async fn execute(
        &self,
        contract: Address,
        input: Bytes,
        gas_limit: u64,
        sender: Address,
        value: U256,
        block: &BlockContext,
    ) -> Result<ExecutionResult, VmError> {
        crate::service::ExecutionEngine::execute(self, contract, input, gas_limit, sender, value, block)
            .await
    }

    async fn deploy(
        &self,
        init_code: Bytes,
        constructor_args: Bytes,
        gas_limit: u64,
        sender: Address,
        value: U256,
        block: &BlockContext,
    ) -> Result<(Contract, ExecutionResult), VmError> {
        crate::service::ExecutionEngine::deploy(
            self,
            init_code,
            constructor_args,
            gas_limit,
            sender,
            value,
            block,
        )
        .await
    }

    async fn estimate_gas(
        &self,
        contract: Address,
        input: Bytes,
        sender: Address,
        value: U256,
        block: &BlockContext,
    ) -> Result<u64, VmError> {
        crate::service::ExecutionEngine::estimate_gas(self, contract, input, sender, value, block).await
    }

    async fn call(
        &self,
        contract: Address,
        input: Bytes,
        sender: Address,
        block: &BlockContext,
    ) -> Result<Bytes, VmError> {
        crate::service::ExecutionEngine::call(self, contract, input, sender, block).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_transaction_is_contract_creation() {
        let tx = SignedTransaction {
            from: Address::ZERO,
            to: None,
            value: U256::zero(),
            nonce: 0,
            gas_price: U256::from(1),
            gas_limit: 21000,
            data: Bytes::new(),
            hash: Hash::ZERO,
        };

        assert!(tx.is_contract_creation());

        let tx_call = SignedTransaction {
            to: Some(Address::new([1u8; 20])),
            ..tx
        };

        assert!(!tx_call.is_contract_creation());
    }
}
