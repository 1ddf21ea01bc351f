//! # Driving Port (Inbound API)
//!
//! The public contract for the Consensus Integration pipeline (spec.md
//! §4.4): drive a block through execution, validate a previously processed
//! block, and roll one back.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use qc_04_state_management::domain::value_objects::Hash;

use crate::domain::block::{ConsensusTransaction, PendingBlock};
use crate::domain::block_validation::BlockValidationReport;
use crate::domain::error::ConsensusError;
use crate::domain::state_transition::StateValidator;

/// Drives blocks through the execution pipeline.
///
/// `ConsensusIntegration` is the sole implementor; the trait exists so
/// callers (and tests) depend on the interface rather than the concrete
/// engine/state-store type parameters.
#[async_trait]
pub trait ConsensusIntegrationApi: Send + Sync {
    /// Executes every transaction in `transactions` against the Execution
    /// Engine, in order, committing each one's state changes to the State
    /// Store as it succeeds. Aborts the block on the first transaction
    /// whose error is block-fatal (`ConsensusError::fails_block`), leaving
    /// already-committed transactions in place for a subsequent
    /// `rollback_block`.
    async fn process_block(
        &self,
        block_number: u64,
        block_hash: Hash,
        transactions: Vec<ConsensusTransaction>,
        timestamp: u64,
        cancellation: &CancellationToken,
    ) -> Result<PendingBlock, ConsensusError>;

    /// Re-validates a previously processed block's recorded outcomes
    /// (gas totals, transaction statuses) and returns a fresh report.
    async fn validate_block(&self, block_number: u64)
        -> Result<BlockValidationReport, ConsensusError>;

    /// Reverses every transaction committed for `block_number`, in the
    /// reverse of their commit order, restoring the State Store to the
    /// contents it held immediately before the block began.
    async fn rollback_block(&self, block_number: u64) -> Result<(), ConsensusError>;

    /// Registers a pluggable state-transition validation rule, run by the
    /// State Transition Manager ahead of every transaction's execution.
    fn add_state_validator(
        &self,
        id: String,
        validator: Box<dyn StateValidator>,
        priority: i32,
    ) -> Result<(), ConsensusError>;
}
