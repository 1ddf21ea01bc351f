//! # Gas Accounting
//!
//! Running per-block and per-contract gas totals, enforcing
//! `MaxGasPerBlock`/`MaxGasPerContract` (spec.md §4.4) by handing back a
//! [`ValidationIssue`] rather than aborting outright — the caller
//! (`process_block`) decides whether an overflow fails the transaction.

use std::collections::HashMap;

use parking_lot::RwLock;
use qc_04_state_management::domain::value_objects::Address;

use crate::domain::block_validation::{IssueKind, Severity, ValidationIssue};

/// Tunables for [`GasAccounting`].
#[derive(Clone, Debug)]
pub struct GasAccountingConfig {
    /// Maximum total gas a single block may consume.
    pub max_gas_per_block: u64,
    /// Maximum cumulative gas a single contract may consume within a block.
    pub max_gas_per_contract: u64,
}

impl Default for GasAccountingConfig {
    fn default() -> Self {
        Self {
            max_gas_per_block: 30_000_000,
            max_gas_per_contract: 10_000_000,
        }
    }
}

#[derive(Default)]
struct Totals {
    per_block: HashMap<u64, u64>,
    per_contract: HashMap<(u64, Address), u64>,
}

/// Tracks gas consumption per block and per (block, contract) pair.
pub struct GasAccounting {
    config: GasAccountingConfig,
    totals: RwLock<Totals>,
}

impl GasAccounting {
    #[must_use]
    pub fn new(config: GasAccountingConfig) -> Self {
        Self {
            config,
            totals: RwLock::new(Totals::default()),
        }
    }

    /// Records `gas_used` against `block_number`/`contract`, returning a
    /// [`ValidationIssue`] if either running total now exceeds its
    /// configured maximum. The totals are updated regardless — callers
    /// that treat the issue as fatal are expected to fail (and eventually
    /// roll back) the whole block, at which point the totals are
    /// meaningless anyway.
    pub fn record(
        &self,
        block_number: u64,
        contract: Address,
        gas_used: u64,
    ) -> Option<ValidationIssue> {
        let mut totals = self.totals.write();

        let block_total = totals.per_block.entry(block_number).or_insert(0);
        *block_total = block_total.saturating_add(gas_used);
        let block_total = *block_total;

        let contract_total = totals
            .per_contract
            .entry((block_number, contract))
            .or_insert(0);
        *contract_total = contract_total.saturating_add(gas_used);
        let contract_total = *contract_total;

        drop(totals);

        if block_total > self.config.max_gas_per_block {
            return Some(ValidationIssue::new(
                IssueKind::GasAccounting,
                Severity::Critical,
                format!(
                    "block {block_number} gas total {block_total} exceeds MaxGasPerBlock {}",
                    self.config.max_gas_per_block
                ),
            ));
        }
        if contract_total > self.config.max_gas_per_contract {
            return Some(ValidationIssue::new(
                IssueKind::GasAccounting,
                Severity::High,
                format!(
                    "contract {contract} gas total {contract_total} in block {block_number} exceeds MaxGasPerContract {}",
                    self.config.max_gas_per_contract
                ),
            ));
        }
        None
    }

    /// Total gas recorded for `block_number` so far.
    #[must_use]
    pub fn block_total(&self, block_number: u64) -> u64 {
        self.totals
            .read()
            .per_block
            .get(&block_number)
            .copied()
            .unwrap_or(0)
    }

    /// Average gas-per-transaction for `block_number`, given `tx_count`.
    #[must_use]
    pub fn block_average(&self, block_number: u64, tx_count: u64) -> f64 {
        if tx_count == 0 {
            return 0.0;
        }
        self.block_total(block_number) as f64 / tx_count as f64
    }

    /// Drops the running totals for `block_number` — called once a block's
    /// gas accounting is no longer needed (committed past the history
    /// window, or rolled back).
    pub fn clear_block(&self, block_number: u64) {
        let mut totals = self.totals.write();
        totals.per_block.remove(&block_number);
        totals
            .per_contract
            .retain(|(block, _), _| *block != block_number);
    }
}

impl Default for GasAccounting {
    fn default() -> Self {
        Self::new(GasAccountingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    #[test]
    fn records_running_totals() {
        let ga = GasAccounting::default();
        assert!(ga.record(1, addr(1), 1000).is_none());
        assert_eq!(ga.block_total(1), 1000);
        assert!(ga.record(1, addr(1), 2000).is_none());
        assert_eq!(ga.block_total(1), 3000);
    }

    #[test]
    fn flags_block_overflow() {
        let ga = GasAccounting::new(GasAccountingConfig {
            max_gas_per_block: 1_000,
            max_gas_per_contract: 1_000_000,
        });
        assert!(ga.record(1, addr(1), 1_500).is_some());
    }

    #[test]
    fn flags_contract_overflow() {
        let ga = GasAccounting::new(GasAccountingConfig {
            max_gas_per_block: 1_000_000,
            max_gas_per_contract: 500,
        });
        assert!(ga.record(1, addr(1), 600).is_some());
    }

    #[test]
    fn clear_block_drops_totals() {
        let ga = GasAccounting::default();
        ga.record(1, addr(1), 500);
        ga.clear_block(1);
        assert_eq!(ga.block_total(1), 0);
    }
}
