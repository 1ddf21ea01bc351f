//! # Consensus Integration Metrics
//!
//! Prometheus metrics for the block pipeline (spec.md §4.4), mirroring the
//! dual `#[cfg(feature = "metrics")]` / no-op pattern used throughout this
//! workspace.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-08-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `consensus_blocks_processed_total` - Counter of successfully processed blocks
//! - `consensus_blocks_failed_total` - Counter of blocks that failed processing
//! - `consensus_blocks_rolled_back_total` - Counter of blocks rolled back
//! - `consensus_gas_used_total` - Counter of total gas consumed by committed transactions
//! - `consensus_validation_latency_seconds` - Histogram of block validation times

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total blocks that reached `BlockStatus::Completed`.
    pub static ref BLOCKS_PROCESSED: IntCounter = register_int_counter!(
        "consensus_blocks_processed_total",
        "Total number of blocks successfully processed"
    )
    .expect("Failed to create BLOCKS_PROCESSED metric");

    /// Total blocks that reached `BlockStatus::Failed`.
    pub static ref BLOCKS_FAILED: IntCounter = register_int_counter!(
        "consensus_blocks_failed_total",
        "Total number of blocks that failed during processing"
    )
    .expect("Failed to create BLOCKS_FAILED metric");

    /// Total blocks rolled back via `rollback_block`.
    pub static ref BLOCKS_ROLLED_BACK: IntCounter = register_int_counter!(
        "consensus_blocks_rolled_back_total",
        "Total number of blocks rolled back"
    )
    .expect("Failed to create BLOCKS_ROLLED_BACK metric");

    /// Total gas consumed by committed transactions, across all blocks.
    pub static ref GAS_USED_TOTAL: IntCounter = register_int_counter!(
        "consensus_gas_used_total",
        "Total gas consumed by committed transactions"
    )
    .expect("Failed to create GAS_USED_TOTAL metric");

    /// Histogram of per-block validation latency.
    pub static ref VALIDATION_LATENCY: Histogram = register_histogram!(
        "consensus_validation_latency_seconds",
        "Time taken to validate a block in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to create VALIDATION_LATENCY metric");
}

/// Record a block reaching `BlockStatus::Completed`.
#[cfg(feature = "metrics")]
pub fn record_block_processed() {
    BLOCKS_PROCESSED.inc();
}

/// Record a block reaching `BlockStatus::Failed`.
#[cfg(feature = "metrics")]
pub fn record_block_failed() {
    BLOCKS_FAILED.inc();
}

/// Record a block rolled back via `rollback_block`.
#[cfg(feature = "metrics")]
pub fn record_block_rolled_back() {
    BLOCKS_ROLLED_BACK.inc();
}

/// Record gas consumed by a committed transaction.
#[cfg(feature = "metrics")]
pub fn record_gas_used(amount: u64) {
    GAS_USED_TOTAL.inc_by(amount);
}

/// Record the wall-clock time a `validate_block` call took.
#[cfg(feature = "metrics")]
pub fn record_validation_latency(seconds: f64) {
    VALIDATION_LATENCY.observe(seconds);
}

// No-op implementations when the metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
pub fn record_block_processed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_failed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_rolled_back() {}

#[cfg(not(feature = "metrics"))]
pub fn record_gas_used(_amount: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_validation_latency(_seconds: f64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_noop_when_disabled() {
        record_block_processed();
        record_block_failed();
        record_block_rolled_back();
        record_gas_used(21_000);
        record_validation_latency(0.01);
    }
}
