//! # Consensus Integration
//!
//! The block-level pipeline (spec.md §4.4): for every transaction in a
//! block, pre-validate, run the Execution Engine, account gas, and commit
//! the resulting state changes to the State Store — or fail the whole block
//! and leave it for [`ConsensusIntegration::rollback_block`] to unwind.
//!
//! Holds non-owning `Arc` handles to the State Store, the Execution Engine,
//! and the Contract Registry (spec.md §9: these are leaves constructed
//! before the Consensus Integration and injected, never owned circularly).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use qc_04_state_management::domain::entities::{u256_to_bytes_be, StateChange as StoreStateChange};
use qc_04_state_management::domain::store::ContractKind;
use qc_04_state_management::domain::value_objects::{Address, Hash};
use qc_04_state_management::ports::api::StateStoreApi;
use qc_11_smart_contracts::domain::entities::{BlockContext, StateChange as EngineStateChange};
use qc_11_smart_contracts::domain::registry::ContractRegistry;
use qc_11_smart_contracts::domain::value_objects::{Address as EngineAddress, Bytes, U256};
use qc_11_smart_contracts::errors::VmError;
use qc_11_smart_contracts::service::ExecutionEngine;

use crate::adapters::StateStoreBridge;
use crate::domain::block::{BlockStatus, CommittedChange, ConsensusTransaction, PendingBlock, TransactionStatus};
use crate::domain::block_validation::{BlockValidationReport, BlockValidator, BlockValidatorConfig};
use crate::domain::error::ConsensusError;
use crate::domain::gas_accounting::{GasAccounting, GasAccountingConfig};
use crate::domain::state_transition::{StateTransitionManager, StateValidator};
use crate::metrics;
use crate::ports::inbound::ConsensusIntegrationApi;

/// Feature gates and sub-component tunables for [`ConsensusIntegration`].
#[derive(Clone, Debug)]
pub struct IntegrationConfig {
    /// Gates `process_block` (spec.md §4.4).
    pub enable_contract_execution: bool,
    /// Gates `rollback_block`.
    pub enable_state_rollback: bool,
    /// Gates `validate_block`.
    pub enable_block_validation: bool,
    pub gas_accounting: GasAccountingConfig,
    pub block_validator: BlockValidatorConfig,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            enable_contract_execution: true,
            enable_state_rollback: true,
            enable_block_validation: true,
            gas_accounting: GasAccountingConfig::default(),
            block_validator: BlockValidatorConfig::default(),
        }
    }
}

/// Running totals the Consensus Integration exposes for observability
/// (spec.md §8's invariant 3 checks these against `ExecutionResult.gas_used`).
#[derive(Debug, Default, Clone)]
pub struct IntegrationStats {
    pub total_blocks_processed: u64,
    pub total_blocks_rolled_back: u64,
    pub successful_transactions: u64,
    pub failed_transactions: u64,
    pub rolled_back_transactions: u64,
}

/// Drives blocks of [`ConsensusTransaction`]s through the Execution Engine
/// and commits their effects to the State Store, atomically at block
/// granularity (spec.md §4.4).
///
/// Generic over the State Store's concrete type so the pipeline can be
/// exercised against a bare `qc_04_state_management::domain::store::StateStore`
/// or a test double implementing [`StateStoreApi`].
pub struct ConsensusIntegration<ST: StateStoreApi> {
    config: IntegrationConfig,
    state_store: Arc<ST>,
    bridge: StateStoreBridge<ST>,
    engine: Arc<ExecutionEngine<StateStoreBridge<ST>, Arc<ContractRegistry>>>,
    registry: Arc<ContractRegistry>,
    transition_manager: Arc<StateTransitionManager>,
    gas_accounting: Arc<GasAccounting>,
    block_validator: Arc<BlockValidator>,
    blocks: RwLock<HashMap<u64, PendingBlock>>,
    stats: RwLock<IntegrationStats>,
}

impl<ST: StateStoreApi + 'static> ConsensusIntegration<ST> {
    /// Wires a fresh pipeline over `state_store`, constructing its own
    /// [`StateStoreBridge`] and [`ContractRegistry`] (the Execution Engine
    /// shares the same registry `Arc` this struct keeps, so
    /// [`ConsensusIntegration::registry`] and CREATE/SELFDESTRUCT bookkeeping
    /// inside the engine observe the same state).
    #[must_use]
    pub fn new(state_store: Arc<ST>, config: IntegrationConfig) -> Self {
        let bridge = StateStoreBridge::new(Arc::clone(&state_store));
        let registry = Arc::new(ContractRegistry::new());
        let engine = Arc::new(ExecutionEngine::new(
            bridge.clone(),
            Arc::clone(&registry),
            qc_11_smart_contracts::service::EngineConfig::default(),
        ));

        Self {
            gas_accounting: Arc::new(GasAccounting::new(config.gas_accounting.clone())),
            block_validator: Arc::new(BlockValidator::new(config.block_validator.clone())),
            config,
            state_store,
            bridge,
            engine,
            registry,
            transition_manager: Arc::new(StateTransitionManager::new()),
            blocks: RwLock::new(HashMap::new()),
            stats: RwLock::new(IntegrationStats::default()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ContractRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn stats(&self) -> IntegrationStats {
        self.stats.read().clone()
    }

    /// Registers a pluggable state-transition validation rule (spec.md
    /// §4.4's State Transition Manager).
    pub fn add_state_validator(
        &self,
        id: impl Into<String>,
        validator: Box<dyn StateValidator>,
        priority: i32,
    ) -> Result<(), ConsensusError> {
        self.transition_manager.add_state_validator(id, validator, priority)
    }

    fn block_context(&self, block_number: u64, timestamp: u64) -> BlockContext {
        BlockContext {
            number: block_number,
            timestamp,
            ..BlockContext::default()
        }
    }

    /// Runs every transaction in `transactions` against the Execution
    /// Engine, in submission order, committing each one's state changes to
    /// the State Store as it succeeds (spec.md §4.4).
    ///
    /// `cancellation` is checked between transactions only: a transaction
    /// already in flight always runs to completion (spec.md §5's
    /// "execution is atomic at transaction granularity").
    #[instrument(skip(self, transactions, cancellation))]
    pub async fn process_block(
        &self,
        block_number: u64,
        block_hash: Hash,
        transactions: Vec<ConsensusTransaction>,
        timestamp: u64,
        cancellation: &CancellationToken,
    ) -> Result<PendingBlock, ConsensusError> {
        if !self.config.enable_contract_execution {
            return Err(ConsensusError::ContractExecutionNotEnabled);
        }

        let mut block = PendingBlock::new(block_number, block_hash, timestamp);
        block.status = BlockStatus::Executing;
        let block_ctx = self.block_context(block_number, timestamp);

        for (index, mut tx) in transactions.into_iter().enumerate() {
            if cancellation.is_cancelled() {
                block.status = BlockStatus::Failed;
                self.blocks.write().insert(block_number, block.clone());
                return Err(ConsensusError::Cancelled(index));
            }

            tx.status = TransactionStatus::Validating;
            if let Err(err) = self.transition_manager.validate_transaction(&tx) {
                tx.status = TransactionStatus::Failed;
                block.transactions.push(tx);
                block.status = BlockStatus::Failed;
                self.stats.write().failed_transactions += 1;
                self.blocks.write().insert(block_number, block.clone());
                metrics::record_block_failed();
                return Err(err);
            }

            tx.status = TransactionStatus::Executing;
            match self.execute_transaction(&mut tx, &block_ctx).await {
                Ok(()) => {
                    tx.status = TransactionStatus::Committed;
                    self.transition_manager.record_committed(tx.clone());
                    self.stats.write().successful_transactions += 1;
                    block.transactions.push(tx);
                }
                Err(err) => {
                    tx.status = TransactionStatus::Failed;
                    block.transactions.push(tx);
                    self.stats.write().failed_transactions += 1;
                    if err.fails_block() {
                        block.status = BlockStatus::Failed;
                        self.blocks.write().insert(block_number, block.clone());
                        metrics::record_block_failed();
                        return Err(err);
                    }
                }
            }
        }

        self.registry.apply_pending_destructions();
        block.status = BlockStatus::Completed;
        self.blocks.write().insert(block_number, block.clone());
        self.stats.write().total_blocks_processed += 1;
        metrics::record_block_processed();
        Ok(block)
    }

    /// Executes one transaction (deploy or call), records its gas and
    /// applies its storage/nonce/balance effects to the State Store,
    /// building the `CommittedChange` log `rollback_block` later unwinds.
    async fn execute_transaction(
        &self,
        tx: &mut ConsensusTransaction,
        block_ctx: &BlockContext,
    ) -> Result<(), ConsensusError> {
        let target = if tx.is_contract_creation() {
            let init_code = Bytes::from_vec(tx.args.clone());
            let (contract, result) = self
                .engine
                .deploy(init_code, Bytes::new(), tx.gas_limit, tx.sender, tx.value, block_ctx)
                .await?;
            self.state_store.create_contract(
                contract.address,
                contract.code.clone(),
                tx.sender,
                ContractKind::Standard,
            )?;
            tx.result = Some(result.clone());
            contract.address
        } else {
            if self.state_store.get_contract_state(tx.contract)?.is_none() {
                return Err(ConsensusError::from(
                    qc_04_state_management::domain::errors::StateError::ContractNotFound(
                        tx.contract.to_string(),
                    ),
                ));
            }
            let input = Bytes::from_vec(tx.args.clone());
            let result = self
                .engine
                .execute(tx.contract, input, tx.gas_limit, tx.sender, tx.value, block_ctx)
                .await?;
            if !result.success {
                return Err(VmError::Revert(
                    result.revert_reason.unwrap_or_else(|| "execution reverted".to_string()),
                )
                .into());
            }
            tx.result = Some(result.clone());
            tx.contract
        };

        let gas_used = tx.result.as_ref().map_or(0, |r| r.gas_used);
        if let Some(issue) = self.gas_accounting.record(tx.block_number, target, gas_used) {
            return Err(ConsensusError::GasLimitExceeded(issue.message));
        }
        metrics::record_gas_used(gas_used);

        let engine_changes = tx.result.as_ref().map_or_else(Vec::new, |r| r.state_changes.clone());

        let mut changes = Vec::new();

        // Every address whose storage the engine touched (the tx's own
        // target plus any nested CALL/CREATE) needs its buffered writes
        // flushed to the State Store, in first-touched order.
        let mut touched_storage = vec![target];
        for change in &engine_changes {
            let address = match change {
                EngineStateChange::StorageWrite { address, .. }
                | EngineStateChange::StorageDelete { address, .. } => Some(*address),
                _ => None,
            };
            if let Some(address) = address {
                let store_address = engine_address_to_store(address);
                if !touched_storage.contains(&store_address) {
                    touched_storage.push(store_address);
                }
            }
        }
        for address in touched_storage {
            for change in self.bridge.commit_address_with_changes(address, tx.block_number)? {
                changes.push(committed_change(address, change));
            }
        }

        // Balance transfers and nonce bumps the engine recorded for nested
        // CALL/CREATE/SELFDESTRUCT (SSTORE is handled above via the bridge).
        // ContractCreate/ContractDestroy bookkeeping lives in the Contract
        // Registry (registry_host.rs's `Host` impl), already applied during
        // execution and by `apply_pending_destructions` after the block.
        for change in &engine_changes {
            match change {
                EngineStateChange::BalanceTransfer { from, to, amount } => {
                    let from = engine_address_to_store(*from);
                    let to = engine_address_to_store(*to);
                    if let Some(change) = self.apply_balance_debit(from, *amount, tx.block_number)? {
                        changes.push(change);
                    }
                    if let Some(change) = self.apply_balance_credit(to, *amount, tx.block_number)? {
                        changes.push(change);
                    }
                }
                EngineStateChange::NonceIncrement { address } => {
                    let address = engine_address_to_store(*address);
                    if let Some(change) = self.apply_nonce_increment(address, tx.block_number)? {
                        changes.push(change);
                    }
                }
                EngineStateChange::StorageWrite { .. }
                | EngineStateChange::StorageDelete { .. }
                | EngineStateChange::ContractCreate { .. }
                | EngineStateChange::ContractDestroy { .. } => {}
            }
        }

        if let Some(change) = self.apply_nonce_increment(tx.sender, tx.block_number)? {
            changes.push(change);
        }
        if !tx.value.is_zero() {
            if let Some(change) = self.apply_balance_debit(tx.sender, tx.value, tx.block_number)? {
                changes.push(change);
            }
            if let Some(change) = self.apply_balance_credit(target, tx.value, tx.block_number)? {
                changes.push(change);
            }
        }
        tx.state_changes = changes;
        Ok(())
    }

    /// Nonce/balance bookkeeping only touches addresses the State Store
    /// already tracks a `ContractState` for (spec.md §3's entity model has
    /// no externally-owned-account concept outside deployed contracts) —
    /// an address with no recorded state is silently skipped rather than
    /// implicitly materialising one.
    fn apply_nonce_increment(
        &self,
        address: Address,
        block_number: u64,
    ) -> Result<Option<CommittedChange>, ConsensusError> {
        let Some(state) = self.state_store.get_contract_state(address)? else {
            return Ok(None);
        };
        let old_nonce = state.nonce;
        let new_nonce = old_nonce + 1;
        self.state_store.update_contract_state(
            address,
            vec![StoreStateChange::Nonce { new: new_nonce }],
            block_number,
        )?;
        Ok(Some(CommittedChange {
            address,
            forward: StoreStateChange::Nonce { new: new_nonce },
            inverse: StoreStateChange::Nonce { new: old_nonce },
        }))
    }

    fn apply_balance_debit(
        &self,
        address: Address,
        value: U256,
        block_number: u64,
    ) -> Result<Option<CommittedChange>, ConsensusError> {
        let Some(state) = self.state_store.get_contract_state(address)? else {
            return Ok(None);
        };
        let old = state.balance_u256();
        let new = old.saturating_sub(value);
        self.apply_balance(address, old, new, block_number).map(Some)
    }

    fn apply_balance_credit(
        &self,
        address: Address,
        value: U256,
        block_number: u64,
    ) -> Result<Option<CommittedChange>, ConsensusError> {
        let Some(state) = self.state_store.get_contract_state(address)? else {
            return Ok(None);
        };
        let old = state.balance_u256();
        let new = old.saturating_add(value);
        self.apply_balance(address, old, new, block_number).map(Some)
    }

    /// Applies a balance transition, carrying the full `U256` magnitude
    /// through to the stored big-endian bytes so transfer amounts at or
    /// above 2^128 round-trip losslessly (spec.md §3's "arbitrary-precision
    /// unsigned integer").
    fn apply_balance(
        &self,
        address: Address,
        old: U256,
        new: U256,
        block_number: u64,
    ) -> Result<CommittedChange, ConsensusError> {
        self.state_store.update_contract_state(
            address,
            vec![StoreStateChange::Balance { new: u256_to_bytes_be(new) }],
            block_number,
        )?;
        Ok(CommittedChange {
            address,
            forward: StoreStateChange::Balance { new: u256_to_bytes_be(new) },
            inverse: StoreStateChange::Balance { new: u256_to_bytes_be(old) },
        })
    }

    /// Re-validates `block_number`'s recorded transaction outcomes,
    /// producing a fresh [`BlockValidationReport`] (spec.md §4.4).
    pub async fn validate_block(&self, block_number: u64) -> Result<BlockValidationReport, ConsensusError> {
        if !self.config.enable_block_validation {
            return Err(ConsensusError::BlockValidationNotEnabled);
        }
        let blocks = self.blocks.read();
        let block = blocks
            .get(&block_number)
            .ok_or(ConsensusError::BlockNotFound(block_number))?;
        let transactions = block.transactions.clone();
        drop(blocks);

        let report = self
            .block_validator
            .validate(block_number, || collect_validation_issues(&transactions));
        metrics::record_validation_latency(report.duration.as_secs_f64());
        Ok(report)
    }

    /// Reverses every transaction committed for `block_number`, in the
    /// reverse of their commit order (spec.md §4.4).
    pub async fn rollback_block(&self, block_number: u64) -> Result<(), ConsensusError> {
        if !self.config.enable_state_rollback {
            return Err(ConsensusError::RollbackNotEnabled);
        }

        let mut block = self
            .blocks
            .write()
            .remove(&block_number)
            .ok_or(ConsensusError::BlockNotFound(block_number))?;

        self.transition_manager.take_block(block_number);
        self.gas_accounting.clear_block(block_number);

        let mut stats = self.stats.write();
        for tx in block.transactions.iter_mut().rev() {
            if tx.status != TransactionStatus::Committed {
                continue;
            }
            for change in tx.state_changes.iter().rev() {
                self.state_store.update_contract_state(
                    change.address,
                    vec![change.inverse.clone()],
                    block_number,
                )?;
            }
            tx.status = TransactionStatus::RolledBack;
            stats.successful_transactions = stats.successful_transactions.saturating_sub(1);
            stats.rolled_back_transactions += 1;
        }
        drop(stats);

        block.status = BlockStatus::RolledBack;
        self.blocks.write().insert(block_number, block);
        self.stats.write().total_blocks_rolled_back += 1;
        metrics::record_block_rolled_back();
        Ok(())
    }
}

#[async_trait::async_trait]
impl<ST: StateStoreApi + 'static> ConsensusIntegrationApi for ConsensusIntegration<ST> {
    async fn process_block(
        &self,
        block_number: u64,
        block_hash: Hash,
        transactions: Vec<ConsensusTransaction>,
        timestamp: u64,
        cancellation: &CancellationToken,
    ) -> Result<PendingBlock, ConsensusError> {
        ConsensusIntegration::process_block(self, block_number, block_hash, transactions, timestamp, cancellation).await
    }

    async fn validate_block(&self, block_number: u64) -> Result<BlockValidationReport, ConsensusError> {
        ConsensusIntegration::validate_block(self, block_number).await
    }

    async fn rollback_block(&self, block_number: u64) -> Result<(), ConsensusError> {
        ConsensusIntegration::rollback_block(self, block_number).await
    }

    fn add_state_validator(
        &self,
        id: String,
        validator: Box<dyn StateValidator>,
        priority: i32,
    ) -> Result<(), ConsensusError> {
        ConsensusIntegration::add_state_validator(self, id, validator, priority)
    }
}

fn engine_address_to_store(address: EngineAddress) -> Address {
    Address::new(address.0)
}

fn committed_change(address: Address, change: StoreStateChange) -> CommittedChange {
    match &change {
        StoreStateChange::Storage { key, old, new } => CommittedChange {
            address,
            forward: StoreStateChange::Storage { key: *key, old: old.clone(), new: new.clone() },
            inverse: StoreStateChange::Storage { key: *key, old: new.clone(), new: old.clone() },
        },
        _ => CommittedChange { address, forward: change.clone(), inverse: change },
    }
}

fn collect_validation_issues(
    transactions: &[ConsensusTransaction],
) -> Vec<crate::domain::block_validation::ValidationIssue> {
    use crate::domain::block_validation::{IssueKind, Severity, ValidationIssue};

    transactions
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Failed)
        .map(|tx| {
            ValidationIssue::new(
                IssueKind::ContractExecution,
                Severity::High,
                format!("transaction {} failed execution", tx.id),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use qc_04_state_management::domain::store::StateStore;
    use qc_04_state_management::domain::value_objects::Address as StoreAddress;

    use super::*;

    fn integration() -> ConsensusIntegration<StateStore> {
        let store = Arc::new(StateStore::new(Default::default()));
        ConsensusIntegration::new(store, IntegrationConfig::default())
    }

    fn sample_tx(contract: Address, block_number: u64) -> ConsensusTransaction {
        ConsensusTransaction::new(
            Hash::new([block_number as u8; 32]),
            block_number,
            Hash::ZERO,
            contract,
            "call",
            Vec::new(),
            100_000,
            U256::zero(),
            StoreAddress::new([1u8; 20]),
            U256::zero(),
            0,
            0,
            0,
        )
    }

    #[tokio::test]
    async fn process_block_disabled_returns_error() {
        let mut config = IntegrationConfig::default();
        config.enable_contract_execution = false;
        let store = Arc::new(StateStore::new(Default::default()));
        let integration = ConsensusIntegration::new(store, config);
        let err = integration
            .process_block(1, Hash::ZERO, Vec::new(), 0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::ContractExecutionNotEnabled));
    }

    #[tokio::test]
    async fn process_block_executes_stop_contract_and_completes() {
        let integration = integration();
        let address = StoreAddress::new([2u8; 20]);
        integration
            .state_store
            .create_contract(address, vec![0x00], StoreAddress::new([1u8; 20]), ContractKind::Standard)
            .unwrap();

        let tx = sample_tx(address, 1);
        let block = integration
            .process_block(1, Hash::ZERO, vec![tx], 0, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(block.status, BlockStatus::Completed);
        assert_eq!(block.transactions[0].status, TransactionStatus::Committed);
        assert_eq!(integration.stats().successful_transactions, 1);
    }

    #[tokio::test]
    async fn process_block_missing_contract_fails_block() {
        let integration = integration();
        let tx = sample_tx(StoreAddress::new([9u8; 20]), 1);
        let err = integration
            .process_block(1, Hash::ZERO, vec![tx], 0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::State(_)));
    }

    #[tokio::test]
    async fn rollback_restores_nonce_and_marks_transactions_rolled_back() {
        let integration = integration();
        let address = StoreAddress::new([3u8; 20]);
        let sender = StoreAddress::new([1u8; 20]);
        integration
            .state_store
            .create_contract(address, vec![0x00], sender, ContractKind::Standard)
            .unwrap();

        let tx = sample_tx(address, 1);
        integration
            .process_block(1, Hash::ZERO, vec![tx], 0, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(integration.state_store.get_contract_state(sender).unwrap(), None);

        integration.rollback_block(1).await.unwrap();
        assert_eq!(integration.stats().rolled_back_transactions, 1);
        assert_eq!(integration.stats().successful_transactions, 0);

        let err = integration.rollback_block(1).await;
        assert!(matches!(err, Err(ConsensusError::BlockNotFound(1))));
    }

    #[tokio::test]
    async fn validate_block_unknown_returns_not_found() {
        let integration = integration();
        let err = integration.validate_block(999).await.unwrap_err();
        assert!(matches!(err, ConsensusError::BlockNotFound(999)));
    }
}
