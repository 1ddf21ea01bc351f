//! # QC-08 Consensus Integration
//!
//! The block-level pipeline that ties the Execution Engine and the State
//! Store together: for every transaction in a block, validate it, run it
//! through the Execution Engine, account its gas, and commit its state
//! changes — or fail the block and leave it for [`ConsensusIntegration`]'s
//! `rollback_block` to unwind.
//!
//! ## Pipeline
//!
//! ```text
//! process_block(transactions)
//!   for each transaction, in order:
//!     StateTransitionManager::validate_transaction
//!     ExecutionEngine::execute / deploy   (via StateStoreBridge + Host)
//!     GasAccounting::record
//!     commit storage/nonce/balance changes to the State Store
//!   ContractRegistry::apply_pending_destructions (deferred SELFDESTRUCT)
//! ```
//!
//! A block-fatal error aborts the loop immediately; already-committed
//! transactions stay recorded against the block until `rollback_block`
//! walks them in reverse and re-applies each `CommittedChange`'s inverse.
//!
//! `validate_block` re-scans a processed block's recorded transaction
//! outcomes and produces a [`domain::block_validation::BlockValidationReport`]
//! — a block is valid iff that report's issue list is empty.
//!
//! ## Module Layout
//!
//! - `domain` — the data model (`ConsensusTransaction`, `PendingBlock`,
//!   `CommittedChange`), the error taxonomy, and the three pipeline stages
//!   (gas accounting, state-transition validation, post-hoc block
//!   validation).
//! - `ports` — the driving API ([`ConsensusIntegrationApi`]) callers depend
//!   on instead of the concrete [`ConsensusIntegration`] type.
//! - `adapters` — [`StateStoreBridge`], which bridges the synchronous State
//!   Store API into the Execution Engine's async `StateAccess` port.
//! - `service` — [`ConsensusIntegration`] itself.
//! - `metrics` — optional Prometheus counters behind the `metrics` feature.

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::StateStoreBridge;
pub use domain::{
    BlockStatus, BlockValidationReport, BlockValidator, BlockValidatorConfig, CommittedChange,
    ConsensusError, ConsensusTransaction, GasAccounting, GasAccountingConfig, IssueKind,
    PendingBlock, Severity, StateTransitionManager, StateValidator, TransactionStatus,
    ValidationIssue,
};
pub use ports::ConsensusIntegrationApi;
pub use service::{ConsensusIntegration, IntegrationConfig, IntegrationStats};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_config_default_enables_every_stage() {
        let config = IntegrationConfig::default();
        assert!(config.enable_contract_execution);
        assert!(config.enable_state_rollback);
        assert!(config.enable_block_validation);
    }
}
