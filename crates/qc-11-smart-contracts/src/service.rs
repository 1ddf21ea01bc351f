//! # Execution Engine
//!
//! The orchestration layer around the [`Interpreter`](crate::evm::Interpreter):
//! builds execution contexts, owns the per-engine access list and transient
//! storage, and exposes the public contract (`execute`, `deploy`,
//! `estimate_gas`, `call`) that callers (the Consensus Integration pipeline,
//! or a direct test harness) drive transactions and calls through.

use crate::adapters::{InMemoryAccessList, InMemoryState};
use crate::domain::entities::{BlockContext, ExecutionContext, ExecutionResult, VmConfig};
use crate::domain::registry::{Contract, ContractRegistry};
use crate::domain::services::{compute_contract_address, keccak256};
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::VmError;
use crate::evm::transient::TransientStorage;
use crate::evm::Interpreter;
use crate::ports::outbound::{AccessList, Host, StateAccess};

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Execution Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// VM configuration (call depth, code size limits, stack/memory caps).
    pub vm_config: VmConfig,
    /// Execution timeout in milliseconds.
    pub execution_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vm_config: VmConfig::default(),
            execution_timeout_ms: 5000,
        }
    }
}

/// Running totals the engine exposes for observability.
#[derive(Debug, Default, Clone)]
pub struct EngineStats {
    /// Total calls executed (`execute` + `deploy` + `call`).
    pub calls_executed: u64,
    /// Calls that completed successfully.
    pub successful_calls: u64,
    /// Calls that reverted or otherwise failed.
    pub failed_calls: u64,
    /// Total gas consumed across all calls.
    pub total_gas_used: u64,
}

/// The execution engine: runs EVM bytecode against a [`StateAccess`] and a
/// [`Host`] (contract registry bookkeeping), tracking its own access list and
/// transient storage.
pub struct ExecutionEngine<S: StateAccess, H: Host> {
    config: EngineConfig,
    state: Arc<S>,
    host: Arc<H>,
    access_list: Arc<RwLock<InMemoryAccessList>>,
    transient: Arc<RwLock<TransientStorage>>,
    stats: Arc<RwLock<EngineStats>>,
}

impl<S: StateAccess, H: Host> ExecutionEngine<S, H> {
    /// Creates a new engine over `state` (the State Store adapter) and `host`
    /// (the Contract Registry, via its [`Host`] implementation).
    pub fn new(state: S, host: H, config: EngineConfig) -> Self {
        Self {
            config,
            state: Arc::new(state),
            host: Arc::new(host),
            access_list: Arc::new(RwLock::new(InMemoryAccessList::new())),
            transient: Arc::new(RwLock::new(TransientStorage::new())),
            stats: Arc::new(RwLock::new(EngineStats::default())),
        }
    }

    /// Current engine statistics.
    pub async fn stats(&self) -> EngineStats {
        self.stats.read().await.clone()
    }

    /// Returns an independent copy of this engine's call-local state (a
    /// fresh access list and transient storage), sharing the underlying
    /// state store and contract registry handles.
    #[must_use]
    pub fn clone_engine(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            host: Arc::clone(&self.host),
            access_list: Arc::new(RwLock::new(InMemoryAccessList::new())),
            transient: Arc::new(RwLock::new(TransientStorage::new())),
            stats: Arc::new(RwLock::new(EngineStats::default())),
        }
    }

    /// Executes a contract call against `contract` with `input` calldata.
    #[instrument(skip(self, input), fields(contract = ?contract))]
    pub async fn execute(
        &self,
        contract: Address,
        input: Bytes,
        gas_limit: u64,
        sender: Address,
        value: U256,
        block: &BlockContext,
    ) -> Result<ExecutionResult, VmError> {
        let code = self.state.get_code(contract).await?;
        let context = ExecutionContext {
            origin: sender,
            caller: sender,
            address: contract,
            value,
            data: input,
            gas_limit,
            gas_price: U256::zero(),
            block: block.clone(),
            depth: 0,
            is_static: false,
        };

        let result = self.run(&context, code.as_slice()).await;
        self.transient.write().await.clear();
        self.record_stats(&result).await;
        result
    }

    /// Deploys new code: runs `init_code` as a top-level call, and on
    /// success registers the resulting contract with the Contract Registry.
    #[instrument(skip(self, init_code, constructor_args))]
    pub async fn deploy(
        &self,
        init_code: Bytes,
        constructor_args: Bytes,
        gas_limit: u64,
        sender: Address,
        value: U256,
        block: &BlockContext,
    ) -> Result<(Contract, ExecutionResult), VmError> {
        let nonce = self.state.get_nonce(sender).await?;
        let address = compute_contract_address(sender, nonce);

        let mut data = init_code.into_vec();
        data.extend_from_slice(constructor_args.as_slice());

        let context = ExecutionContext {
            origin: sender,
            caller: sender,
            address,
            value,
            data: Bytes::from_vec(data.clone()),
            gas_limit,
            gas_price: U256::zero(),
            block: block.clone(),
            depth: 0,
            is_static: false,
        };

        let result = self.run(&context, &data).await?;
        self.transient.write().await.clear();

        if !result.success {
            self.record_stats(&Ok(result.clone())).await;
            return Err(VmError::Revert(
                result
                    .revert_reason
                    .clone()
                    .unwrap_or_else(|| "deployment reverted".to_string()),
            ));
        }

        let contract = Contract {
            address,
            code: result.output.clone().into_vec(),
            code_hash: keccak256(result.output.as_slice()),
            creator: sender,
            creation_block: block.number,
        };
        self.host
            .register_contract(contract.clone())
            .await
            .then_some(())
            .ok_or(VmError::ContractAlreadyExists(address))?;

        self.record_stats(&Ok(result.clone())).await;
        Ok((contract, result))
    }

    /// Estimates gas for a call without applying any state changes.
    pub async fn estimate_gas(
        &self,
        contract: Address,
        input: Bytes,
        sender: Address,
        value: U256,
        block: &BlockContext,
    ) -> Result<u64, VmError> {
        let code = self.state.get_code(contract).await?;
        let context = ExecutionContext {
            origin: sender,
            caller: sender,
            address: contract,
            value,
            data: input,
            gas_limit: self.config.vm_config.max_gas_limit(),
            gas_price: U256::zero(),
            block: block.clone(),
            depth: 0,
            is_static: false,
        };

        let result = self.run(&context, code.as_slice()).await?;
        self.transient.write().await.clear();

        Ok(result.gas_used + (result.gas_used / 10).max(21_000))
    }

    /// Executes a read-only call (`eth_call`): forces `is_static`, discarding
    /// any state changes the interpreter still accumulates internally.
    pub async fn call(
        &self,
        contract: Address,
        input: Bytes,
        sender: Address,
        block: &BlockContext,
    ) -> Result<Bytes, VmError> {
        let code = self.state.get_code(contract).await?;
        let context = ExecutionContext {
            origin: sender,
            caller: sender,
            address: contract,
            value: U256::zero(),
            data: input,
            gas_limit: self.config.vm_config.max_gas_limit(),
            gas_price: U256::zero(),
            block: block.clone(),
            depth: 0,
            is_static: true,
        };

        let result = self.run(&context, code.as_slice()).await?;
        self.transient.write().await.clear();

        if result.success {
            Ok(result.output)
        } else {
            Err(VmError::Revert(
                result
                    .revert_reason
                    .unwrap_or_else(|| "execution reverted".to_string()),
            ))
        }
    }

    /// Runs `code` under `context`, applying the engine's timeout and
    /// pre-warming the caller/callee/origin per EIP-2929.
    async fn run(&self, context: &ExecutionContext, code: &[u8]) -> Result<ExecutionResult, VmError> {
        {
            let mut access_list = self.access_list.write().await;
            access_list.warm_account(context.origin);
            access_list.warm_account(context.address);
            if context.caller != context.origin {
                access_list.warm_account(context.caller);
            }
        }

        let timeout = std::time::Duration::from_millis(self.config.execution_timeout_ms);
        let context = context.clone();
        let state = Arc::clone(&self.state);
        let host = Arc::clone(&self.host);
        let access_list = Arc::clone(&self.access_list);
        let transient = Arc::clone(&self.transient);

        tokio::time::timeout(timeout, async move {
            let mut access_list = access_list.write().await;
            let mut transient = transient.write().await;
            let mut interpreter = Interpreter::new(
                context,
                code,
                &*state,
                &mut *access_list,
                &*host,
                &mut *transient,
            );
            interpreter.execute().await
        })
        .await
        .map_err(|_| VmError::Timeout {
            elapsed_ms: self.config.execution_timeout_ms,
            max_ms: self.config.execution_timeout_ms,
        })?
    }

    async fn record_stats(&self, result: &Result<ExecutionResult, VmError>) {
        let mut stats = self.stats.write().await;
        stats.calls_executed += 1;
        match result {
            Ok(res) if res.success => {
                stats.successful_calls += 1;
                stats.total_gas_used += res.gas_used;
            }
            Ok(res) => {
                stats.failed_calls += 1;
                stats.total_gas_used += res.gas_used;
            }
            Err(err) => {
                warn!(error = %err, "execution failed");
                stats.failed_calls += 1;
            }
        }
        debug!(calls_executed = stats.calls_executed, "engine stats updated");
    }
}

/// Creates a default engine with in-memory adapters (for testing).
#[must_use]
pub fn create_test_engine() -> ExecutionEngine<InMemoryState, ContractRegistry> {
    ExecutionEngine::new(
        InMemoryState::new(),
        ContractRegistry::new(),
        EngineConfig::default(),
    )
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Hash;

    #[tokio::test]
    async fn test_create_engine() {
        let engine = create_test_engine();
        let stats = engine.stats().await;
        assert_eq!(stats.calls_executed, 0);
    }

    #[tokio::test]
    async fn test_call_on_empty_contract_returns_empty_output() {
        let engine = create_test_engine();
        let block = BlockContext::default();

        let result = engine
            .call(Address::ZERO, Bytes::new(), Address::ZERO, &block)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_deploy_simple_returns_contract() {
        let engine = create_test_engine();
        let block = BlockContext::default();

        // PUSH1 0x00 PUSH1 0x00 RETURN: deploys empty code.
        let init_code = Bytes::from_slice(&[0x60, 0x00, 0x60, 0x00, 0xF3]);
        let (contract, result) = engine
            .deploy(
                init_code,
                Bytes::new(),
                1_000_000,
                Address::new([1u8; 20]),
                U256::zero(),
                &block,
            )
            .await
            .unwrap();

        assert!(result.success);
        assert!(contract.code.is_empty());
        assert_eq!(contract.creator, Address::new([1u8; 20]));
    }

    #[tokio::test]
    async fn test_estimate_gas_floor() {
        let engine = create_test_engine();
        let block = BlockContext::default();

        let gas = engine
            .estimate_gas(Address::ZERO, Bytes::new(), Address::ZERO, U256::zero(), &block)
            .await
            .unwrap();
        assert!(gas >= 21_000);
    }

    #[tokio::test]
    async fn test_clone_engine_shares_state_handle() {
        let engine = create_test_engine();
        let cloned = engine.clone_engine();

        let contract = Contract {
            address: Address::new([7u8; 20]),
            code: vec![0x00],
            code_hash: Hash::new([1u8; 32]),
            creator: Address::ZERO,
            creation_block: 0,
        };
        engine.host.register_contract(contract).await;
        assert!(cloned.host.contract_exists(Address::new([7u8; 20])).await);
    }
}
