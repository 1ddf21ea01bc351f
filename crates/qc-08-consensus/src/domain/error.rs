//! # Consensus Integration Error Types
//!
//! Taxonomy drawn from spec.md §7 (the *Validation* and *Lifecycle* kinds),
//! plus wrapping variants for errors bubbling up from the Execution Engine
//! and the State Store.

use thiserror::Error;

use qc_04_state_management::domain::errors::StateError;
use qc_11_smart_contracts::errors::VmError;

/// Errors raised by the Consensus Integration pipeline.
#[derive(Debug, Error, Clone)]
pub enum ConsensusError {
    /// `ProcessBlock`/`ValidateBlock`/`RollbackBlock` called while the
    /// corresponding feature flag is disabled.
    #[error("contract execution is disabled")]
    ContractExecutionNotEnabled,

    /// `RollbackBlock` called with `EnableStateRollback` off.
    #[error("state rollback is disabled")]
    RollbackNotEnabled,

    /// `ValidateBlock` called with block validation off.
    #[error("block validation is disabled")]
    BlockValidationNotEnabled,

    /// `AddStateValidator` called with an `id` already registered.
    #[error("state validator already registered: {0}")]
    ValidatorAlreadyExists(String),

    /// `RollbackBlock`/`ValidateBlock` referenced a block number with no
    /// recorded `PendingBlock`.
    #[error("block not found: {0}")]
    BlockNotFound(u64),

    /// `ValidateBlock` exceeded `MaxValidationTime`.
    #[error("validation timed out after {elapsed_ms}ms (max {max_ms}ms)")]
    ValidationTimeout { elapsed_ms: u64, max_ms: u64 },

    /// A `ConsensusTransaction` failed pre-validation: nil/zero sender.
    #[error("invalid sender address")]
    InvalidSender,

    /// A `ConsensusTransaction` failed pre-validation: `gas_limit` is zero.
    #[error("invalid gas limit: must be greater than zero")]
    InvalidGasLimit,

    /// A `ConsensusTransaction` failed pre-validation: `gas_price` is set
    /// and zero.
    #[error("invalid gas price: must be greater than zero when set")]
    InvalidGasPrice,

    /// A `ConsensusTransaction` targeted an address that is neither an
    /// existing contract nor a valid contract-creation marker.
    #[error("invalid contract address")]
    InvalidContractAddress,

    /// Gas Accounting rejected a transaction: the running total for the
    /// block or contract would exceed its configured maximum.
    #[error("gas accounting limit exceeded: {0}")]
    GasLimitExceeded(String),

    /// `process_block` observed a cancelled `CancellationToken` between two
    /// transactions and stopped before starting the next one.
    #[error("block processing cancelled at transaction index {0}")]
    Cancelled(usize),

    /// A registered `StateValidator` rejected a transaction during the
    /// State Transition Manager's validation pass.
    #[error("state transition rejected: {0}")]
    StateTransitionRejected(String),

    /// The Execution Engine failed.
    #[error("execution failed: {0}")]
    Execution(#[from] VmError),

    /// The State Store or Storage Adapter failed.
    #[error("state error: {0}")]
    State(#[from] StateError),
}

impl ConsensusError {
    /// Whether this error should mark the owning block `Failed` (true for
    /// everything except feature-gate errors, which reject the call before
    /// any `PendingBlock` is created).
    #[must_use]
    pub fn fails_block(&self) -> bool {
        !matches!(
            self,
            Self::ContractExecutionNotEnabled
                | Self::RollbackNotEnabled
                | Self::BlockValidationNotEnabled
        )
    }
}
