//! Per-fixture orchestration: produce, load, normalize, compare.

use goldcheck_fs::Filesystem;
use goldcheck_schema::{
    Artifact, ComparisonOutcome, ComparisonResult, Fixture, RegenOutcome, RegenResult,
};
use sha2::{Digest, Sha256};

use crate::baseline::{BaselineError, BaselineStore, StoreOutcome};
use crate::diff::diff_artifacts;
use crate::normalize::normalize;
use crate::producer::{ArtifactProducer, FixtureSource, ProducerError};

/// Runs one fixture at a time against a baseline store.
pub struct CaseRunner<'a, F: Filesystem, P: ArtifactProducer> {
    store: &'a BaselineStore<F>,
    producer: &'a mut P,
}

impl<'a, F: Filesystem, P: ArtifactProducer> CaseRunner<'a, F, P> {
    pub fn new(store: &'a BaselineStore<F>, producer: &'a mut P) -> Self {
        Self { store, producer }
    }

    /// Compare the fixture's actual artifact with its baseline. Never writes.
    pub fn verify(&mut self, fixture: &Fixture) -> ComparisonResult {
        let actual = match self.produce(fixture) {
            Ok(text) => text,
            Err(e) => {
                return ComparisonResult::new(
                    fixture.clone(),
                    ComparisonOutcome::ProducerError {
                        detail: e.to_string(),
                    },
                )
            }
        };
        let sha256 = compute_sha256(actual.as_bytes());

        let outcome = match self.store.load(fixture) {
            Ok(expected) => {
                let expected = normalize(expected.as_str());
                match diff_artifacts(&fixture.relative_path, &expected, &actual) {
                    None => ComparisonOutcome::Match,
                    Some(diff) => ComparisonOutcome::Mismatch { diff },
                }
            }
            Err(BaselineError::Missing(_)) => ComparisonOutcome::MissingBaseline {
                expected_path: self.store.expected_relative_path(fixture),
            },
            Err(e) => ComparisonOutcome::BaselineUnreadable {
                detail: e.to_string(),
            },
        };

        ComparisonResult::new(fixture.clone(), outcome).with_sha256(sha256)
    }

    /// Rewrite the fixture's baseline with its normalized actual artifact.
    pub fn regenerate(&mut self, fixture: &Fixture) -> RegenResult {
        let actual = match self.produce(fixture) {
            Ok(text) => text,
            Err(e) => {
                return RegenResult::new(
                    fixture.clone(),
                    RegenOutcome::ProducerError {
                        detail: e.to_string(),
                    },
                )
            }
        };
        let sha256 = compute_sha256(actual.as_bytes());

        let outcome = match self.store.store(fixture, &Artifact::from(actual)) {
            Ok(StoreOutcome::Created) => RegenOutcome::Created,
            Ok(StoreOutcome::Updated) => RegenOutcome::Updated,
            Ok(StoreOutcome::Unchanged) => RegenOutcome::Unchanged,
            Err(e) => RegenOutcome::StoreError {
                detail: e.to_string(),
            },
        };

        RegenResult::new(fixture.clone(), outcome).with_sha256(sha256)
    }

    /// Read the fixture and return the normalized producer output.
    fn produce(&mut self, fixture: &Fixture) -> Result<String, ProducerError> {
        let path = self.store.fixture_path(fixture);
        let text = self
            .store
            .fs()
            .read_file(&path)
            .map_err(|e| ProducerError::Source {
                path: path.clone(),
                source: e,
            })?;

        let source = FixtureSource {
            fixture,
            path: &path,
            text: &text,
        };
        let artifact = self.producer.produce(&source)?;
        Ok(normalize(artifact.as_str()))
    }
}

/// SHA-256 of `data` as lowercase hex.
fn compute_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
