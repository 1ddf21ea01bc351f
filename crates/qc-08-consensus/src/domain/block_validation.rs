//! # Block Validator
//!
//! Post-hoc validation of a committed block (spec.md §4.4's `ValidateBlock`):
//! a time-bounded, idempotent check keyed by block number, producing zero or
//! more [`ValidationIssue`]s rather than a single pass/fail bit — a block
//! with only `Low`/`Medium` issues is still reported `Invalid` (spec.md: a
//! block is valid iff its issue list is empty), but callers inspecting
//! `severity` can distinguish "needs attention" from "reject immediately".

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// The subsystem a [`ValidationIssue`] was raised by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueKind {
    ContractExecution,
    StateValidation,
    GasAccounting,
    Consensus,
    Other,
}

/// How serious a [`ValidationIssue`] is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A single defect found while validating a block.
#[derive(Clone, Debug)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
}

impl ValidationIssue {
    #[must_use]
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

/// Tunables for [`BlockValidator`].
#[derive(Clone, Debug)]
pub struct BlockValidatorConfig {
    /// Upper bound on how long a single `validate_block` call may run
    /// before it is abandoned and reported as a timeout.
    pub max_validation_time: Duration,
}

impl Default for BlockValidatorConfig {
    fn default() -> Self {
        Self {
            max_validation_time: Duration::from_secs(5),
        }
    }
}

/// The outcome of validating one block.
#[derive(Clone, Debug)]
pub struct BlockValidationReport {
    pub block_number: u64,
    pub issues: Vec<ValidationIssue>,
    pub duration: Duration,
}

impl BlockValidationReport {
    /// A block is valid iff it raised no issues at all (spec.md §4.4).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validates a block's recorded transaction outcomes and caches the report,
/// keyed by block number. Re-validating the same block number overwrites
/// the previous report (idempotent re-validation, spec.md §4.4).
pub struct BlockValidator {
    config: BlockValidatorConfig,
    reports: RwLock<HashMap<u64, BlockValidationReport>>,
}

impl BlockValidator {
    #[must_use]
    pub fn new(config: BlockValidatorConfig) -> Self {
        Self {
            config,
            reports: RwLock::new(HashMap::new()),
        }
    }

    /// Runs `collect_issues` with a wall-clock budget of `MaxValidationTime`,
    /// storing (and returning) the resulting report. `collect_issues` itself
    /// has no cancellation hook — it is expected to be a fast, synchronous
    /// scan over already-recorded transaction outcomes — so the timeout is
    /// enforced by checking elapsed time after the scan completes rather
    /// than interrupting it mid-flight.
    pub fn validate(
        &self,
        block_number: u64,
        collect_issues: impl FnOnce() -> Vec<ValidationIssue>,
    ) -> BlockValidationReport {
        let start = Instant::now();
        let mut issues = collect_issues();
        let duration = start.elapsed();

        if duration > self.config.max_validation_time {
            issues.push(ValidationIssue::new(
                IssueKind::Consensus,
                Severity::Critical,
                format!(
                    "validation took {}ms, exceeding MaxValidationTime {}ms",
                    duration.as_millis(),
                    self.config.max_validation_time.as_millis()
                ),
            ));
        }

        let report = BlockValidationReport {
            block_number,
            issues,
            duration,
        };
        self.reports.write().insert(block_number, report.clone());
        report
    }

    /// Returns the most recently recorded report for `block_number`, if any.
    #[must_use]
    pub fn report(&self, block_number: u64) -> Option<BlockValidationReport> {
        self.reports.read().get(&block_number).cloned()
    }
}

impl Default for BlockValidator {
    fn default() -> Self {
        Self::new(BlockValidatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_issues_is_valid() {
        let validator = BlockValidator::default();
        let report = validator.validate(1, Vec::new);
        assert!(report.is_valid());
    }

    #[test]
    fn any_issue_makes_block_invalid() {
        let validator = BlockValidator::default();
        let report = validator.validate(1, || {
            vec![ValidationIssue::new(IssueKind::Other, Severity::Low, "minor")]
        });
        assert!(!report.is_valid());
    }

    #[test]
    fn revalidation_overwrites_report() {
        let validator = BlockValidator::default();
        validator.validate(1, || {
            vec![ValidationIssue::new(IssueKind::Other, Severity::Low, "first")]
        });
        let second = validator.validate(1, Vec::new);
        assert!(second.is_valid());
        assert!(validator.report(1).unwrap().is_valid());
    }

    #[test]
    fn slow_validation_flagged_as_timeout() {
        let validator = BlockValidator::new(BlockValidatorConfig {
            max_validation_time: Duration::from_millis(0),
        });
        let report = validator.validate(1, || {
            std::thread::sleep(Duration::from_millis(5));
            Vec::new()
        });
        assert!(!report.is_valid());
        assert!(report
            .issues
            .iter()
            .any(|i| i.severity == Severity::Critical));
    }

    #[test]
    fn unvalidated_block_has_no_report() {
        let validator = BlockValidator::default();
        assert!(validator.report(99).is_none());
    }
}
