//! goldcheck schema
//!
//! Defines the fixture and registry records, per-fixture outcomes, and the
//! versioned registry file format shared by the harness and the CLI.

mod fixture;
mod outcome;
mod report;

pub use fixture::{Fixture, RegistryEntry, RegistryFile, RegistryFileError, REGISTRY_VERSION};
pub use outcome::{
    Artifact, ArtifactDiff, ComparisonOutcome, ComparisonResult, NotRunReason, RegenOutcome,
    RegenResult,
};
pub use report::{
    CompletenessResult, OutcomeCounts, RegenCounts, RegenReport, SuiteReport,
    UnregisteredFixture, UnregisteredReason,
};
