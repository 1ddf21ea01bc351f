//! # Block & Transaction Entities
//!
//! The Consensus Integration's own data model (spec.md §3): a
//! [`PendingBlock`] owns an ordered list of [`ConsensusTransaction`]s keyed
//! by block number, tracking both through their respective status
//! lifecycles as `process_block` drives them to completion.

use qc_04_state_management::domain::entities::StateChange;
use qc_04_state_management::domain::value_objects::{Address, Hash};
use qc_11_smart_contracts::domain::entities::ExecutionResult;
use qc_11_smart_contracts::domain::value_objects::U256;

/// One store-level mutation a transaction applied, paired with the change
/// that undoes it.
///
/// `ContractCreate` has no representation here — the State Store exposes no
/// "uncreate" operation, so `rollback_block` cannot undo a contract
/// deployment (see DESIGN.md's rollback Open Question resolution). Every
/// other mutation (`Storage`, `Balance`, `Nonce`, `Metadata`) is invertible
/// because the Consensus Integration captures the pre-image at apply time,
/// before it is overwritten.
#[derive(Clone, Debug)]
pub struct CommittedChange {
    pub address: Address,
    pub forward: StateChange,
    pub inverse: StateChange,
}

/// Lifecycle of a single [`ConsensusTransaction`].
///
/// Transitions: `Pending` -> `Validating` -> `Executing` -> one of the
/// terminal states (`Committed`, `Failed`, `RolledBack`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Validating,
    Executing,
    Committed,
    Failed,
    RolledBack,
}

impl TransactionStatus {
    /// Terminal statuses are `Committed`, `Failed`, and `RolledBack` — once
    /// reached, a transaction never transitions again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Failed | Self::RolledBack)
    }
}

/// Lifecycle of a [`PendingBlock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockStatus {
    Pending,
    Executing,
    Completed,
    Failed,
    RolledBack,
}

/// A single contract invocation tracked through the consensus pipeline.
///
/// `contract == Address::ZERO` signals a contract-creation transaction:
/// `process_block` synthesises a fresh target address (via the Execution
/// Engine's `deploy`) rather than dispatching to an existing contract,
/// matching spec.md §4.4's "fetch or synthesise the target contract" step.
#[derive(Clone, Debug)]
pub struct ConsensusTransaction {
    pub id: Hash,
    pub block_number: u64,
    pub block_hash: Hash,
    pub contract: Address,
    pub method: String,
    pub args: Vec<u8>,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub sender: Address,
    pub value: U256,
    pub nonce: u64,
    pub status: TransactionStatus,
    pub result: Option<ExecutionResult>,
    pub state_changes: Vec<CommittedChange>,
    pub consensus_round: u64,
    pub timestamp: u64,
}

impl ConsensusTransaction {
    /// Creates a fresh, unvalidated transaction in the `Pending` state.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Hash,
        block_number: u64,
        block_hash: Hash,
        contract: Address,
        method: impl Into<String>,
        args: Vec<u8>,
        gas_limit: u64,
        gas_price: U256,
        sender: Address,
        value: U256,
        nonce: u64,
        consensus_round: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            id,
            block_number,
            block_hash,
            contract,
            method: method.into(),
            args,
            gas_limit,
            gas_price,
            sender,
            value,
            nonce,
            status: TransactionStatus::Pending,
            result: None,
            state_changes: Vec::new(),
            consensus_round,
            timestamp,
        }
    }

    /// Whether this transaction is a contract-creation request.
    #[must_use]
    pub fn is_contract_creation(&self) -> bool {
        self.contract == Address::ZERO
    }
}

/// A block moving through the execution pipeline: owns its transactions,
/// exactly as spec.md §3 describes (the Consensus Integration is the sole
/// owner of every `PendingBlock`, keyed by block number).
#[derive(Clone, Debug)]
pub struct PendingBlock {
    pub block_number: u64,
    pub block_hash: Hash,
    pub transactions: Vec<ConsensusTransaction>,
    pub status: BlockStatus,
    pub created_at: u64,
}

impl PendingBlock {
    #[must_use]
    pub fn new(block_number: u64, block_hash: Hash, timestamp: u64) -> Self {
        Self {
            block_number,
            block_hash,
            transactions: Vec::new(),
            status: BlockStatus::Pending,
            created_at: timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_contract_address_signals_creation() {
        let tx = ConsensusTransaction::new(
            Hash::ZERO,
            1,
            Hash::ZERO,
            Address::ZERO,
            "deploy",
            Vec::new(),
            1,
            U256::zero(),
            Address::new([1u8; 20]),
            U256::zero(),
            0,
            0,
            0,
        );
        assert!(tx.is_contract_creation());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TransactionStatus::Committed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::RolledBack.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Executing.is_terminal());
    }
}
