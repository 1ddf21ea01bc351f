//! # State Store Metrics
//!
//! Prometheus counters for the State Store, mirroring the dual
//! feature-gated / no-op pattern used throughout this workspace.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-04-state-management = { path = "...", features = ["metrics"] }
//! ```

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, IntCounter};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total contracts created via `CreateContract`.
    pub static ref CONTRACTS_CREATED: IntCounter = register_int_counter!(
        "state_store_contracts_created_total",
        "Total number of contracts created"
    )
    .expect("Failed to create CONTRACTS_CREATED metric");

    /// Total accepted `UpdateContractState` calls.
    pub static ref STATE_UPDATES: IntCounter = register_int_counter!(
        "state_store_updates_total",
        "Total number of accepted state updates"
    )
    .expect("Failed to create STATE_UPDATES metric");
}

/// Record a contract creation.
#[cfg(feature = "metrics")]
pub fn record_contract_created() {
    CONTRACTS_CREATED.inc();
}

/// Record an accepted state update.
#[cfg(feature = "metrics")]
pub fn record_state_updated() {
    STATE_UPDATES.inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_contract_created() {}

#[cfg(not(feature = "metrics"))]
pub fn record_state_updated() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_noop_when_disabled() {
        record_contract_created();
        record_state_updated();
    }
}
