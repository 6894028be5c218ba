//! Per-fixture artifacts and outcomes.

use serde::{Deserialize, Serialize};

use crate::fixture::Fixture;

/// Canonical text representation of the system-under-test output for one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact {
    text: String,
}

impl Artifact {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<String> for Artifact {
    fn from(text: String) -> Self {
        Self { text }
    }
}

impl From<&str> for Artifact {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Line-level description of an expected/actual mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDiff {
    /// 1-based line of the first difference.
    pub first_diff_line: usize,
    pub expected_excerpt: Option<String>,
    pub actual_excerpt: Option<String>,
    pub expected_lines: usize,
    pub actual_lines: usize,
    /// Unified diff, expected on the `-` side.
    pub unified: String,
}

/// Why a fixture was never handed to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotRunReason {
    /// The suite deadline passed before the fixture was scheduled.
    Timeout,
    /// The run was interrupted (Ctrl+C).
    Interrupted,
}

impl std::fmt::Display for NotRunReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotRunReason::Timeout => write!(f, "suite timeout"),
            NotRunReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Result of verifying one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Match,
    Mismatch { diff: ArtifactDiff },
    /// No expected artifact recorded yet; regeneration creates it.
    MissingBaseline { expected_path: String },
    /// The system under test failed on this fixture.
    ProducerError { detail: String },
    /// A baseline exists but could not be read.
    BaselineUnreadable { detail: String },
    NotRun { reason: NotRunReason },
}

impl ComparisonOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, ComparisonOutcome::Match)
    }

    /// Short stable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ComparisonOutcome::Match => "match",
            ComparisonOutcome::Mismatch { .. } => "mismatch",
            ComparisonOutcome::MissingBaseline { .. } => "missing-baseline",
            ComparisonOutcome::ProducerError { .. } => "producer-error",
            ComparisonOutcome::BaselineUnreadable { .. } => "baseline-unreadable",
            ComparisonOutcome::NotRun { .. } => "not-run",
        }
    }
}

/// Outcome of verifying a single fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub fixture: Fixture,
    pub outcome: ComparisonOutcome,
    /// SHA-256 of the normalized actual artifact, when one was produced.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub actual_sha256: Option<String>,
}

impl ComparisonResult {
    pub fn new(fixture: Fixture, outcome: ComparisonOutcome) -> Self {
        Self {
            fixture,
            outcome,
            actual_sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: String) -> Self {
        self.actual_sha256 = Some(sha256);
        self
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_match()
    }
}

/// Result of regenerating one baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegenOutcome {
    /// No baseline existed; one was written.
    Created,
    /// The baseline content changed.
    Updated,
    /// The baseline was rewritten with identical content.
    Unchanged,
    ProducerError { detail: String },
    StoreError { detail: String },
    NotRun { reason: NotRunReason },
}

impl RegenOutcome {
    /// True when the baseline now reflects the producer output.
    pub fn is_written(&self) -> bool {
        matches!(
            self,
            RegenOutcome::Created | RegenOutcome::Updated | RegenOutcome::Unchanged
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            RegenOutcome::Created => "created",
            RegenOutcome::Updated => "updated",
            RegenOutcome::Unchanged => "unchanged",
            RegenOutcome::ProducerError { .. } => "producer-error",
            RegenOutcome::StoreError { .. } => "store-error",
            RegenOutcome::NotRun { .. } => "not-run",
        }
    }
}

/// Outcome of regenerating a single fixture's baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenResult {
    pub fixture: Fixture,
    pub outcome: RegenOutcome,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sha256: Option<String>,
}

impl RegenResult {
    pub fn new(fixture: Fixture, outcome: RegenOutcome) -> Self {
        Self {
            fixture,
            outcome,
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: String) -> Self {
        self.sha256 = Some(sha256);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Fixture {
        Fixture::new("simple.kt", "testSimple")
    }

    #[test]
    fn test_artifact_conversions() {
        let a = Artifact::from("abc");
        assert_eq!(a.as_str(), "abc");
        assert!(!a.is_empty());
        assert_eq!(Artifact::from(String::from("abc")), a);
        assert!(Artifact::default().is_empty());
    }

    #[test]
    fn test_artifact_serializes_as_string() {
        let json = serde_json::to_string(&Artifact::new("x\ny")).unwrap();
        assert_eq!(json, r#""x\ny""#);
    }

    #[test]
    fn test_outcome_labels_are_distinct() {
        let outcomes = [
            ComparisonOutcome::Match,
            ComparisonOutcome::Mismatch {
                diff: ArtifactDiff {
                    first_diff_line: 1,
                    expected_excerpt: None,
                    actual_excerpt: None,
                    expected_lines: 0,
                    actual_lines: 0,
                    unified: String::new(),
                },
            },
            ComparisonOutcome::MissingBaseline {
                expected_path: "simple.txt".into(),
            },
            ComparisonOutcome::ProducerError {
                detail: "boom".into(),
            },
            ComparisonOutcome::BaselineUnreadable {
                detail: "denied".into(),
            },
            ComparisonOutcome::NotRun {
                reason: NotRunReason::Timeout,
            },
        ];
        let mut labels: Vec<_> = outcomes.iter().map(|o| o.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), outcomes.len());
        assert!(outcomes[0].is_match());
        assert!(outcomes[1..].iter().all(|o| !o.is_match()));
    }

    #[test]
    fn test_outcome_json_tagging() {
        let result = ComparisonResult::new(
            fixture(),
            ComparisonOutcome::MissingBaseline {
                expected_path: "simple.txt".into(),
            },
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""kind":"missing_baseline""#));
        assert!(json.contains(r#""expected_path":"simple.txt""#));
        assert!(!json.contains("actual_sha256"));

        let back: ComparisonResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_not_run_reason_json_and_display() {
        let outcome = ComparisonOutcome::NotRun {
            reason: NotRunReason::Interrupted,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"kind":"not_run","reason":"interrupted"}"#);
        assert_eq!(NotRunReason::Timeout.to_string(), "suite timeout");
    }

    #[test]
    fn test_regen_outcome_is_written() {
        assert!(RegenOutcome::Created.is_written());
        assert!(RegenOutcome::Updated.is_written());
        assert!(RegenOutcome::Unchanged.is_written());
        assert!(!RegenOutcome::ProducerError {
            detail: "x".into()
        }
        .is_written());
        assert!(!RegenOutcome::NotRun {
            reason: NotRunReason::Timeout
        }
        .is_written());
    }

    #[test]
    fn test_result_with_sha256() {
        let result = RegenResult::new(fixture(), RegenOutcome::Created).with_sha256("ab".into());
        assert_eq!(result.sha256.as_deref(), Some("ab"));
        let cmp = ComparisonResult::new(fixture(), ComparisonOutcome::Match).with_sha256("cd".into());
        assert!(cmp.passed());
        assert_eq!(cmp.actual_sha256.as_deref(), Some("cd"));
    }
}
