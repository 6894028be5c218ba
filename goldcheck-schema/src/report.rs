//! Suite-level aggregates.

use serde::{Deserialize, Serialize};

use crate::fixture::{Fixture, RegistryEntry};
use crate::outcome::{ComparisonOutcome, ComparisonResult, RegenOutcome, RegenResult};

/// Why a discovered fixture is not covered by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnregisteredReason {
    /// No entry carries the fixture's derived id.
    NoEntry,
    /// An entry carries the id but points at a different fixture path.
    PathMismatch { registered: String },
}

/// A fixture present on disk but absent from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisteredFixture {
    pub fixture: Fixture,
    pub reason: UnregisteredReason,
}

/// Result of cross-checking discovered fixtures against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletenessResult {
    /// False when no cross-check ran (no registry, or a subset run).
    pub checked: bool,
    /// True when registry entries were also checked against disk.
    pub reverse_checked: bool,
    pub unregistered: Vec<UnregisteredFixture>,
    /// Registry entries with no on-disk fixture (reverse check only).
    pub orphans: Vec<RegistryEntry>,
}

impl CompletenessResult {
    /// A result for a run where the cross-check did not apply.
    pub fn unchecked() -> Self {
        Self::default()
    }

    /// True when no violation was found.
    pub fn is_complete(&self) -> bool {
        self.unregistered.is_empty() && self.orphans.is_empty()
    }

    pub fn violation_count(&self) -> usize {
        self.unregistered.len() + self.orphans.len()
    }
}

/// Per-kind tallies of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub matched: usize,
    pub mismatched: usize,
    pub missing_baseline: usize,
    pub producer_errors: usize,
    pub baseline_unreadable: usize,
    pub not_run: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.matched
            + self.mismatched
            + self.missing_baseline
            + self.producer_errors
            + self.baseline_unreadable
            + self.not_run
    }

    pub fn failed(&self) -> usize {
        self.total() - self.matched
    }
}

/// Aggregated result of a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub generated_at: String,
    pub root: String,
    pub elapsed_ms: u64,
    pub completeness: CompletenessResult,
    /// Sorted by fixture path.
    pub results: Vec<ComparisonResult>,
}

impl SuiteReport {
    /// True when the registry is complete and every fixture matched.
    pub fn passed(&self) -> bool {
        self.completeness.is_complete() && self.results.iter().all(|r| r.passed())
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for result in &self.results {
            match result.outcome {
                ComparisonOutcome::Match => counts.matched += 1,
                ComparisonOutcome::Mismatch { .. } => counts.mismatched += 1,
                ComparisonOutcome::MissingBaseline { .. } => counts.missing_baseline += 1,
                ComparisonOutcome::ProducerError { .. } => counts.producer_errors += 1,
                ComparisonOutcome::BaselineUnreadable { .. } => counts.baseline_unreadable += 1,
                ComparisonOutcome::NotRun { .. } => counts.not_run += 1,
            }
        }
        counts
    }

    /// Results that did not match.
    pub fn failures(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// Serialize to pretty JSON with a trailing newline.
    pub fn to_json(&self) -> String {
        let mut json = serde_json::to_string_pretty(self).unwrap_or_default();
        json.push('\n');
        json
    }
}

/// Per-kind tallies of a regeneration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegenCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub not_run: usize,
}

/// Aggregated result of a regeneration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenReport {
    pub generated_at: String,
    pub root: String,
    pub elapsed_ms: u64,
    /// Sorted by fixture path.
    pub results: Vec<RegenResult>,
}

impl RegenReport {
    /// True when every selected baseline was written.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_written())
    }

    pub fn counts(&self) -> RegenCounts {
        let mut counts = RegenCounts::default();
        for result in &self.results {
            match result.outcome {
                RegenOutcome::Created => counts.created += 1,
                RegenOutcome::Updated => counts.updated += 1,
                RegenOutcome::Unchanged => counts.unchanged += 1,
                RegenOutcome::ProducerError { .. } | RegenOutcome::StoreError { .. } => {
                    counts.failed += 1
                }
                RegenOutcome::NotRun { .. } => counts.not_run += 1,
            }
        }
        counts
    }

    pub fn to_json(&self) -> String {
        let mut json = serde_json::to_string_pretty(self).unwrap_or_default();
        json.push('\n');
        json
    }
}
