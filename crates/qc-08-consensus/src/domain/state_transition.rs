//! # State Transition Manager
//!
//! Pluggable, priority-ordered transaction validation (spec.md §4.4's
//! `AddStateValidator`/`ExecuteTransaction`), plus the bookkeeping
//! `process_block` needs to reverse a block's committed transactions on
//! `rollback_block`.
//!
//! Actual execution against the Execution Engine and State Store stays with
//! the caller (`ConsensusIntegration::process_block`) — this manager owns
//! only the validation pipeline and the per-block commit ledger, so it has
//! no dependency on either `SmartContractApi` or `StateStoreApi`.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::block::ConsensusTransaction;
use crate::domain::error::ConsensusError;

/// A pluggable rule run against a [`ConsensusTransaction`] before execution.
///
/// Distinct from the fixed pre-validation `process_block` always applies
/// (sender/gas-limit sanity) — these are caller-supplied, e.g. nonce
/// ordering, allow-lists, or per-contract policy.
pub trait StateValidator: Send + Sync {
    /// Returns `Err` with a human-readable reason to reject `tx`.
    fn validate(&self, tx: &ConsensusTransaction) -> Result<(), String>;
}

struct ValidatorEntry {
    id: String,
    priority: i32,
    enabled: bool,
    validator: Box<dyn StateValidator>,
}

/// Validates transactions through a fixed pre-check plus a priority-ordered
/// chain of [`StateValidator`]s, and tracks which transactions committed
/// under which block number so `rollback_block` knows what to unwind.
pub struct StateTransitionManager {
    validators: RwLock<Vec<ValidatorEntry>>,
    committed: RwLock<HashMap<u64, Vec<ConsensusTransaction>>>,
}

impl StateTransitionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: RwLock::new(Vec::new()),
            committed: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `validator` under `id` at `priority` (higher runs first).
    /// Rejects a duplicate `id` rather than silently replacing it, since a
    /// silent replace would change validation behaviour for blocks already
    /// in flight.
    pub fn add_state_validator(
        &self,
        id: impl Into<String>,
        validator: Box<dyn StateValidator>,
        priority: i32,
    ) -> Result<(), ConsensusError> {
        let id = id.into();
        let mut validators = self.validators.write();
        if validators.iter().any(|entry| entry.id == id) {
            return Err(ConsensusError::ValidatorAlreadyExists(id));
        }
        validators.push(ValidatorEntry {
            id,
            priority,
            enabled: true,
            validator,
        });
        validators.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(())
    }

    /// Enables or disables a registered validator without unregistering it.
    pub fn set_validator_enabled(&self, id: &str, enabled: bool) {
        let mut validators = self.validators.write();
        if let Some(entry) = validators.iter_mut().find(|entry| entry.id == id) {
            entry.enabled = enabled;
        }
    }

    /// Runs fixed pre-validation, then every enabled [`StateValidator`] in
    /// priority order, aborting on the first failure of either stage.
    pub fn validate_transaction(&self, tx: &ConsensusTransaction) -> Result<(), ConsensusError> {
        if tx.sender.is_zero() {
            return Err(ConsensusError::InvalidSender);
        }
        if tx.gas_limit == 0 {
            return Err(ConsensusError::InvalidGasLimit);
        }

        for entry in self.validators.read().iter().filter(|entry| entry.enabled) {
            entry
                .validator
                .validate(tx)
                .map_err(ConsensusError::StateTransitionRejected)?;
        }
        Ok(())
    }

    /// Records a transaction that has reached `TransactionStatus::Committed`,
    /// under its own `block_number`, for later retrieval by `take_block`.
    pub fn record_committed(&self, tx: ConsensusTransaction) {
        self.committed
            .write()
            .entry(tx.block_number)
            .or_default()
            .push(tx);
    }

    /// Removes and returns every transaction recorded for `block_number`, in
    /// the order they were committed. Used by `rollback_block` to walk the
    /// block's transactions in reverse for a symmetric unwind.
    pub fn take_block(&self, block_number: u64) -> Vec<ConsensusTransaction> {
        self.committed.write().remove(&block_number).unwrap_or_default()
    }

    /// How many transactions are currently recorded for `block_number`.
    #[must_use]
    pub fn committed_count(&self, block_number: u64) -> usize {
        self.committed
            .read()
            .get(&block_number)
            .map_or(0, Vec::len)
    }
}

impl Default for StateTransitionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use qc_04_state_management::domain::value_objects::{Address, Hash};
    use qc_11_smart_contracts::domain::value_objects::U256;

    use super::*;

    fn sample_tx(block_number: u64) -> ConsensusTransaction {
        ConsensusTransaction::new(
            Hash::ZERO,
            block_number,
            Hash::ZERO,
            Address::new([2u8; 20]),
            "call",
            Vec::new(),
            21_000,
            U256::zero(),
            Address::new([1u8; 20]),
            U256::zero(),
            0,
            0,
            0,
        )
    }

    struct RejectAll;
    impl StateValidator for RejectAll {
        fn validate(&self, _tx: &ConsensusTransaction) -> Result<(), String> {
            Err("nope".into())
        }
    }

    struct AcceptAll;
    impl StateValidator for AcceptAll {
        fn validate(&self, _tx: &ConsensusTransaction) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn duplicate_validator_id_rejected() {
        let manager = StateTransitionManager::new();
        manager
            .add_state_validator("a", Box::new(AcceptAll), 0)
            .unwrap();
        let err = manager
            .add_state_validator("a", Box::new(AcceptAll), 0)
            .unwrap_err();
        assert!(matches!(err, ConsensusError::ValidatorAlreadyExists(_)));
    }

    #[test]
    fn zero_sender_rejected_before_custom_validators() {
        let manager = StateTransitionManager::new();
        manager
            .add_state_validator("accept", Box::new(AcceptAll), 0)
            .unwrap();
        let mut tx = sample_tx(1);
        tx.sender = Address::ZERO;
        let err = manager.validate_transaction(&tx).unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidSender));
    }

    #[test]
    fn higher_priority_validator_runs_first_and_aborts() {
        let manager = StateTransitionManager::new();
        manager
            .add_state_validator("low", Box::new(AcceptAll), 0)
            .unwrap();
        manager
            .add_state_validator("high", Box::new(RejectAll), 10)
            .unwrap();
        let err = manager.validate_transaction(&sample_tx(1)).unwrap_err();
        assert!(matches!(err, ConsensusError::StateTransitionRejected(_)));
    }

    #[test]
    fn disabled_validator_is_skipped() {
        let manager = StateTransitionManager::new();
        manager
            .add_state_validator("reject", Box::new(RejectAll), 0)
            .unwrap();
        manager.set_validator_enabled("reject", false);
        assert!(manager.validate_transaction(&sample_tx(1)).is_ok());
    }

    #[test]
    fn take_block_drains_committed_transactions_in_order() {
        let manager = StateTransitionManager::new();
        manager.record_committed(sample_tx(5));
        manager.record_committed(sample_tx(5));
        assert_eq!(manager.committed_count(5), 2);
        let drained = manager.take_block(5);
        assert_eq!(drained.len(), 2);
        assert_eq!(manager.committed_count(5), 0);
    }
}
