//! Suite orchestration.
//!
//! [`HarnessDriver`] scans the root, gates the suite on registry
//! completeness, fans fixtures out to worker threads and aggregates the
//! results into a [`SuiteReport`] or [`RegenReport`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use goldcheck_clock::{Clock, Deadline};
use goldcheck_fs::{Filesystem, FsError};
use goldcheck_schema::{
    ComparisonOutcome, ComparisonResult, CompletenessResult, Fixture, NotRunReason, RegenOutcome,
    RegenReport, RegenResult, SuiteReport, UnregisteredReason,
};
use thiserror::Error;

use crate::baseline::BaselineStore;
use crate::config::{ConfigError, HarnessConfig};
use crate::discovery::{discover, DiscoveryError};
use crate::identifier::{derive_all, CollisionError};
use crate::lock::{ensure_not_regenerating, LockError, LockHolder, RunLock, LOCK_FILE_NAME};
use crate::logger::Logger;
use crate::producer::{ProducerError, ProducerFactory};
use crate::registry::{cross_check, Registry};
use crate::report::format_timestamp;
use crate::runner::CaseRunner;
use crate::shutdown::ShutdownCheck;

/// Fatal errors that abort a run before or instead of producing a report.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Collision(#[from] CollisionError),

    #[error("no fixture matches: {}", .0.join(", "))]
    UnknownFixture(Vec<String>),

    #[error(
        "{} is being regenerated by {holder}; remove {} if that run is gone",
        .root.display(),
        .root.join(LOCK_FILE_NAME).display()
    )]
    RootBusy {
        root: std::path::PathBuf,
        holder: LockHolder,
    },

    #[error("failed to access root lock: {0}")]
    Lock(#[source] FsError),

    #[error("failed to create producer: {0}")]
    Producer(#[source] ProducerError),

    #[error("a worker thread panicked")]
    WorkerPanicked,
}

impl From<LockError> for HarnessError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Busy { root, holder } => HarnessError::RootBusy { root, holder },
            LockError::Fs(e) => HarnessError::Lock(e),
        }
    }
}

/// Which fixtures a run covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    /// Fixtures named by identifier or relative path. The registry
    /// cross-check is skipped for these runs.
    Ids(Vec<String>),
}

/// Runs suites over one test-data root.
pub struct HarnessDriver<'a, F: Filesystem, C: Clock, L: Logger> {
    config: HarnessConfig,
    fs: &'a F,
    clock: &'a C,
    logger: &'a L,
    shutdown: Option<&'a dyn ShutdownCheck>,
}

impl<'a, F: Filesystem, C: Clock, L: Logger> HarnessDriver<'a, F, C, L> {
    pub fn new(config: HarnessConfig, fs: &'a F, clock: &'a C, logger: &'a L) -> Self {
        Self {
            config,
            fs,
            clock,
            logger,
            shutdown: None,
        }
    }

    /// Stop scheduling fixtures once `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: &'a dyn ShutdownCheck) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Discover fixtures and derive their identifiers.
    pub fn scan(&self) -> Result<Vec<Fixture>, HarnessError> {
        self.config.validate()?;
        let discovery = self.config.discovery_config()?;
        let files = discover(self.fs, &discovery)?;
        let fixtures = derive_all(&self.config.id_prefix, files)?;
        self.logger.info(&format!(
            "discovered {} fixture(s) under {}",
            fixtures.len(),
            self.config.root.display()
        ));
        Ok(fixtures)
    }

    /// Verify the selected fixtures. Never writes baselines.
    pub fn verify<PF: ProducerFactory>(
        &self,
        factory: &PF,
        registry: Option<&Registry>,
        selection: &Selection,
    ) -> Result<SuiteReport, HarnessError> {
        let start = self.clock.now_millis();
        let fixtures = self.scan()?;
        let selected = select(&fixtures, selection)?;

        let completeness = match (registry, selection) {
            (Some(registry), Selection::All) => {
                let result = cross_check(&fixtures, registry, self.config.reverse_check);
                self.log_completeness(&result);
                result
            }
            (Some(_), Selection::Ids(_)) => {
                self.logger
                    .debug("partial selection: registry cross-check skipped");
                CompletenessResult::unchecked()
            }
            (None, _) => {
                self.logger.debug("no registry: cross-check skipped");
                CompletenessResult::unchecked()
            }
        };

        if let Some(holder) =
            ensure_not_regenerating(self.fs, &self.config.root, self.config.force_unlock)?
        {
            self.logger.warn(&format!(
                "ignoring lock held by {} on {}",
                holder,
                self.config.root.display()
            ));
        }
        let store = BaselineStore::new(
            self.fs,
            self.config.root.clone(),
            self.config.baseline_extension.clone(),
        );
        let deadline = self.deadline(start);

        let results = self.run_pool(
            factory,
            &selected,
            deadline,
            |producer, fixture| CaseRunner::new(&store, producer).verify(fixture),
            |fixture, detail| {
                ComparisonResult::new(
                    fixture.clone(),
                    ComparisonOutcome::ProducerError {
                        detail: format!("producer panicked: {}", detail),
                    },
                )
            },
            |fixture, reason| {
                ComparisonResult::new(fixture.clone(), ComparisonOutcome::NotRun { reason })
            },
        )?;

        for result in &results {
            self.logger.verbose(&format!(
                "{:<20} {}",
                result.outcome.label(),
                result.fixture.relative_path
            ));
        }

        let report = SuiteReport {
            generated_at: format_timestamp(start),
            root: self.config.root.display().to_string(),
            elapsed_ms: self.clock.now_millis().saturating_sub(start),
            completeness,
            results,
        };

        let counts = report.counts();
        self.logger.info(&format!(
            "verify: {} of {} matched, {} failed, {} completeness violation(s)",
            counts.matched,
            counts.total(),
            counts.failed(),
            report.completeness.violation_count()
        ));
        self.logger
            .debug(&format!("verify finished in {} ms", report.elapsed_ms));
        Ok(report)
    }

    /// Rewrite baselines for the selected fixtures.
    pub fn regenerate<PF: ProducerFactory>(
        &self,
        factory: &PF,
        selection: &Selection,
    ) -> Result<RegenReport, HarnessError> {
        let start = self.clock.now_millis();
        let fixtures = self.scan()?;
        let selected = select(&fixtures, selection)?;

        let _lock = RunLock::acquire(self.fs, &self.config.root, self.config.force_unlock)?;
        let store = BaselineStore::new(
            self.fs,
            self.config.root.clone(),
            self.config.baseline_extension.clone(),
        );
        let deadline = self.deadline(start);

        let results = self.run_pool(
            factory,
            &selected,
            deadline,
            |producer, fixture| CaseRunner::new(&store, producer).regenerate(fixture),
            |fixture, detail| {
                RegenResult::new(
                    fixture.clone(),
                    RegenOutcome::ProducerError {
                        detail: format!("producer panicked: {}", detail),
                    },
                )
            },
            |fixture, reason| RegenResult::new(fixture.clone(), RegenOutcome::NotRun { reason }),
        )?;

        for result in &results {
            self.logger.verbose(&format!(
                "{:<20} {}",
                result.outcome.label(),
                result.fixture.relative_path
            ));
        }

        let report = RegenReport {
            generated_at: format_timestamp(start),
            root: self.config.root.display().to_string(),
            elapsed_ms: self.clock.now_millis().saturating_sub(start),
            results,
        };

        let counts = report.counts();
        self.logger.info(&format!(
            "regenerate: {} created, {} updated, {} unchanged, {} failed, {} not run",
            counts.created, counts.updated, counts.unchanged, counts.failed, counts.not_run
        ));
        Ok(report)
    }

    fn deadline(&self, start: u64) -> Deadline {
        match self.config.timeout_sec {
            Some(sec) => Deadline::after(start, sec.saturating_mul(1000)),
            None => Deadline::none(),
        }
    }

    /// Reported before any comparison runs.
    fn log_completeness(&self, result: &CompletenessResult) {
        for entry in &result.unregistered {
            let fixture = &entry.fixture;
            match &entry.reason {
                UnregisteredReason::NoEntry => self.logger.warn(&format!(
                    "unregistered fixture {}: no registry entry for {}",
                    fixture.relative_path, fixture.derived_id
                )),
                UnregisteredReason::PathMismatch { registered } => self.logger.warn(&format!(
                    "unregistered fixture {}: {} is registered for {}",
                    fixture.relative_path, fixture.derived_id, registered
                )),
            }
        }
        for orphan in &result.orphans {
            self.logger.warn(&format!(
                "registry entry {} points at missing fixture {}",
                orphan.id, orphan.fixture
            ));
        }
    }

    fn stop_reason(&self, deadline: &Deadline) -> Option<NotRunReason> {
        if self.shutdown.is_some_and(|s| s.should_stop()) {
            return Some(NotRunReason::Interrupted);
        }
        if deadline.expired(self.clock) {
            return Some(NotRunReason::Timeout);
        }
        None
    }

    /// Run `work` over `fixtures` on up to `jobs` threads.
    ///
    /// Each worker owns one producer. A panic inside `work` is reported for
    /// that fixture through `panicked` and the worker continues with a fresh
    /// producer. Workers check for shutdown and the deadline before claiming
    /// the next fixture; fixtures never claimed are reported through
    /// `not_run`. Output order follows `fixtures`.
    fn run_pool<PF, T, W, P, N>(
        &self,
        factory: &PF,
        fixtures: &[Fixture],
        deadline: Deadline,
        work: W,
        panicked: P,
        not_run: N,
    ) -> Result<Vec<T>, HarnessError>
    where
        PF: ProducerFactory,
        T: Send,
        W: Fn(&mut PF::Producer, &Fixture) -> T + Sync,
        P: Fn(&Fixture, String) -> T + Sync,
        N: Fn(&Fixture, NotRunReason) -> T,
    {
        if fixtures.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.config.jobs.clamp(1, fixtures.len());
        let mut producers = Vec::with_capacity(workers);
        for _ in 0..workers {
            producers.push(factory.create().map_err(HarnessError::Producer)?);
        }
        self.logger.debug(&format!(
            "running {} fixture(s) on {} worker(s)",
            fixtures.len(),
            workers
        ));

        let cursor = AtomicUsize::new(0);
        let stop_slot: Mutex<Option<NotRunReason>> = Mutex::new(None);
        let rebuild_failed = AtomicBool::new(false);
        let rebuild_error: Mutex<Option<ProducerError>> = Mutex::new(None);
        let (next, stopped, work, panicked) = (&cursor, &stop_slot, &work, &panicked);
        let (aborted, abort_error) = (&rebuild_failed, &rebuild_error);

        let joined = std::thread::scope(|scope| {
            let handles: Vec<_> = producers
                .into_iter()
                .map(|mut producer| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            if aborted.load(Ordering::SeqCst) {
                                break;
                            }
                            if let Some(reason) = self.stop_reason(&deadline) {
                                let mut stopped = stopped.lock().unwrap_or_else(|e| e.into_inner());
                                stopped.get_or_insert(reason);
                                break;
                            }
                            let index = next.fetch_add(1, Ordering::SeqCst);
                            let Some(fixture) = fixtures.get(index) else {
                                break;
                            };

                            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                                work(&mut producer, fixture)
                            }));
                            match outcome {
                                Ok(result) => done.push((index, result)),
                                Err(payload) => {
                                    let detail = panic_message(payload.as_ref());
                                    self.logger.warn(&format!(
                                        "producer panicked on {}: {}",
                                        fixture.relative_path, detail
                                    ));
                                    done.push((index, panicked(fixture, detail)));
                                    match factory.create() {
                                        Ok(fresh) => producer = fresh,
                                        Err(e) => {
                                            let mut slot = abort_error
                                                .lock()
                                                .unwrap_or_else(|poisoned| poisoned.into_inner());
                                            slot.get_or_insert(e);
                                            aborted.store(true, Ordering::SeqCst);
                                            break;
                                        }
                                    }
                                }
                            }
                        }
                        done
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });

        if let Some(e) = rebuild_error.into_inner().unwrap_or_else(|e| e.into_inner()) {
            return Err(HarnessError::Producer(e));
        }

        let mut slots: Vec<Option<T>> = fixtures.iter().map(|_| None).collect();
        for worker in joined {
            let done = worker.map_err(|_| HarnessError::WorkerPanicked)?;
            for (index, result) in done {
                slots[index] = Some(result);
            }
        }

        let reason = stop_slot
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or(NotRunReason::Interrupted);
        let skipped = slots.iter().filter(|s| s.is_none()).count();
        if skipped > 0 {
            self.logger
                .warn(&format!("{} fixture(s) not run: {}", skipped, reason));
        }

        Ok(slots
            .into_iter()
            .zip(fixtures)
            .map(|(slot, fixture)| slot.unwrap_or_else(|| not_run(fixture, reason)))
            .collect())
    }
}

/// Text of a panic payload from `panic!` with a literal or formatted message.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Narrow the scan to the requested fixtures, in scan order.
fn select(fixtures: &[Fixture], selection: &Selection) -> Result<Vec<Fixture>, HarnessError> {
    let names = match selection {
        Selection::All => return Ok(fixtures.to_vec()),
        Selection::Ids(names) => names,
    };

    let matches = |f: &Fixture, name: &str| f.derived_id == name || f.relative_path == name;
    let unknown: Vec<String> = names
        .iter()
        .filter(|name| !fixtures.iter().any(|f| matches(f, name)))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(HarnessError::UnknownFixture(unknown));
    }

    Ok(fixtures
        .iter()
        .filter(|f| names.iter().any(|name| matches(f, name)))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Level, MockLogger, NullLogger};
    use crate::producer::{FixtureSource, MockProducer};
    use crate::shutdown::ShutdownFlag;
    use goldcheck_clock::{AdvancingClock, MockClock};
    use goldcheck_fs::MockFilesystem;
    use goldcheck_schema::{Artifact, RegistryEntry, RegistryFile};
    use std::path::Path;

    const T0: u64 = 1_767_225_600_000; // 2026-01-01T00:00:00Z

    fn fs_with(files: &[(&str, &str)]) -> MockFilesystem {
        let fs = MockFilesystem::new();
        fs.add_dir("/data");
        for (path, content) in files {
            fs.add_file(format!("/data/{}", path), *content);
        }
        fs
    }

    fn registry(entries: &[(&str, &str)]) -> Registry {
        let file = RegistryFile::new(
            entries
                .iter()
                .map(|(id, path)| RegistryEntry::new(*id, *path))
                .collect(),
        );
        Registry::from_entries(file.entries).unwrap()
    }

    fn config() -> HarnessConfig {
        HarnessConfig::new("/data").with_jobs(2)
    }

    // ===========================================
    // Scan and selection
    // ===========================================

    #[test]
    fn test_scan_derives_ids_in_path_order() {
        let fs = fs_with(&[("b.kt", ""), ("a.kt", ""), ("a.txt", "")]);
        let clock = MockClock::new(T0);
        let logger = MockLogger::new();
        let driver = HarnessDriver::new(config(), &fs, &clock, &logger);

        let fixtures = driver.scan().unwrap();
        assert_eq!(
            fixtures,
            vec![Fixture::new("a.kt", "testA"), Fixture::new("b.kt", "testB")]
        );
        assert!(logger.contains("discovered 2 fixture(s)"));
    }

    #[test]
    fn test_scan_rejects_invalid_config() {
        let fs = fs_with(&[]);
        let clock = MockClock::new(T0);
        let logger = MockLogger::new();
        let driver = HarnessDriver::new(config().with_jobs(0), &fs, &clock, &logger);
        assert!(matches!(driver.scan(), Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_collision_aborts_before_any_comparison() {
        let fs = fs_with(&[("customSimple.kt", ""), ("CustomSimple.kt", "")]);
        let clock = MockClock::new(T0);
        let logger = MockLogger::new();
        let producer = MockProducer::echo();
        let driver = HarnessDriver::new(config(), &fs, &clock, &logger);

        let err = driver
            .verify(&producer, None, &Selection::All)
            .unwrap_err();
        assert!(matches!(err, HarnessError::Collision(_)));
        assert!(producer.calls().is_empty());
    }

    #[test]
    fn test_select_by_id_or_path() {
        let fixtures = vec![Fixture::new("a.kt", "testA"), Fixture::new("b.kt", "testB")];
        let picked = select(&fixtures, &Selection::Ids(vec!["b.kt".into()])).unwrap();
        assert_eq!(picked, vec![Fixture::new("b.kt", "testB")]);
        let picked = select(&fixtures, &Selection::Ids(vec!["testA".into()])).unwrap();
        assert_eq!(picked, vec![Fixture::new("a.kt", "testA")]);
    }

    #[test]
    fn test_select_unknown_is_fatal() {
        let fixtures = vec![Fixture::new("a.kt", "testA")];
        let err = select(&fixtures, &Selection::Ids(vec!["testNope".into()])).unwrap_err();
        assert!(matches!(err, HarnessError::UnknownFixture(ids) if ids == vec!["testNope"]));
    }

    // ===========================================
    // Verify
    // ===========================================

    #[test]
    fn test_verify_reports_sorted_results() {
        let fs = fs_with(&[
            ("c.kt", "C"),
            ("c.txt", "C\n"),
            ("a.kt", "A"),
            ("a.txt", "A\n"),
            ("b.kt", "B"),
            ("b.txt", "B\n"),
        ]);
        let clock = MockClock::new(T0);
        let logger = MockLogger::new();
        let driver = HarnessDriver::new(config().with_jobs(3), &fs, &clock, &logger);

        let report = driver
            .verify(&MockProducer::echo(), None, &Selection::All)
            .unwrap();
        let paths: Vec<_> = report
            .results
            .iter()
            .map(|r| r.fixture.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["a.kt", "b.kt", "c.kt"]);
        assert!(report.passed());
        assert!(!report.completeness.checked);
        assert_eq!(report.generated_at, "2026-01-01T00:00:00Z");
        assert_eq!(report.root, "/data");
    }

    #[test]
    fn test_completeness_logged_before_comparisons() {
        let fs = fs_with(&[("simple.kt", "S"), ("simple.txt", "S\n"), ("newFeature.kt", "N")]);
        let clock = MockClock::new(T0);
        let logger = MockLogger::new();
        let driver = HarnessDriver::new(config(), &fs, &clock, &logger);
        let reg = registry(&[("testSimple", "simple.kt")]);

        let report = driver
            .verify(&MockProducer::echo(), Some(&reg), &Selection::All)
            .unwrap();

        assert!(report.completeness.checked);
        assert_eq!(report.completeness.unregistered.len(), 1);
        assert_eq!(
            report.completeness.unregistered[0].fixture.relative_path,
            "newFeature.kt"
        );
        // The unregistered fixture is still verified.
        assert_eq!(report.results.len(), 2);
        assert!(!report.passed());

        let warning = logger.position("unregistered fixture newFeature.kt").unwrap();
        let first_outcome = logger.position("simple.kt").unwrap();
        assert!(warning < first_outcome);
        assert_eq!(logger.messages_at(Level::Warn).len(), 1);
    }

    #[test]
    fn test_subset_run_skips_cross_check() {
        let fs = fs_with(&[("a.kt", "A"), ("a.txt", "A\n"), ("b.kt", "B")]);
        let clock = MockClock::new(T0);
        let driver = HarnessDriver::new(config(), &fs, &clock, &NullLogger);
        let reg = registry(&[]);

        let report = driver
            .verify(
                &MockProducer::echo(),
                Some(&reg),
                &Selection::Ids(vec!["testA".into()]),
            )
            .unwrap();
        assert!(!report.completeness.checked);
        assert_eq!(report.results.len(), 1);
        assert!(report.passed());
    }

    #[test]
    fn test_verify_never_writes_baselines() {
        let fs = fs_with(&[("a.kt", "A"), ("b.kt", "B"), ("b.txt", "other\n")]);
        let clock = MockClock::new(T0);
        let driver = HarnessDriver::new(config(), &fs, &clock, &NullLogger);

        let report = driver
            .verify(&MockProducer::echo(), None, &Selection::All)
            .unwrap();
        let counts = report.counts();
        assert_eq!(counts.missing_baseline, 1);
        assert_eq!(counts.mismatched, 1);
        assert_eq!(fs.write_count(), 0);
        assert!(fs.get_file(Path::new("/data/a.txt")).is_none());
        // Verification leaves no lock file behind, nor creates one.
        assert!(fs.get_file(Path::new("/data/.goldcheck.lock")).is_none());
    }

    #[test]
    fn test_verify_busy_root() {
        let fs = fs_with(&[("a.kt", "A"), (".goldcheck.lock", "regenerate 4242\n")]);
        let clock = MockClock::new(T0);
        let producer = MockProducer::echo();
        let driver = HarnessDriver::new(config(), &fs, &clock, &NullLogger);

        let err = driver.verify(&producer, None, &Selection::All).unwrap_err();
        match &err {
            HarnessError::RootBusy { holder, .. } => {
                assert_eq!(holder.mode, "regenerate");
                assert_eq!(holder.pid, Some(4242));
            }
            other => panic!("unexpected: {other}"),
        }
        assert!(err.to_string().contains("/data/.goldcheck.lock"));
        assert!(producer.calls().is_empty());
    }

    #[test]
    fn test_concurrent_verify_runs_share_root() {
        let fs = fs_with(&[("a.kt", "A"), ("a.txt", "A\n"), ("b.kt", "B"), ("b.txt", "B\n")]);
        let clock = MockClock::new(T0);
        let producer = MockProducer::echo();
        let (fs, clock, producer) = (&fs, &clock, &producer);

        let reports: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(move || {
                        HarnessDriver::new(config(), fs, clock, &NullLogger).verify(
                            producer,
                            None,
                            &Selection::All,
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for report in reports {
            assert!(report.unwrap().passed());
        }
        assert_eq!(fs.write_count(), 0);
    }

    #[test]
    fn test_verify_while_regenerate_lock_held() {
        let fs = fs_with(&[("a.kt", "A"), ("a.txt", "A\n")]);
        let clock = MockClock::new(T0);
        let _held = RunLock::acquire(&fs, Path::new("/data"), false).unwrap();
        let driver = HarnessDriver::new(config(), &fs, &clock, &NullLogger);

        let err = driver
            .verify(&MockProducer::echo(), None, &Selection::All)
            .unwrap_err();
        assert!(matches!(err, HarnessError::RootBusy { .. }));
    }

    #[test]
    fn test_verify_force_unlock_ignores_stale_lock() {
        let fs = fs_with(&[("a.kt", "A"), ("a.txt", "A\n"), (".goldcheck.lock", "regenerate 999999\n")]);
        let clock = MockClock::new(T0);
        let logger = MockLogger::new();
        let driver = HarnessDriver::new(config().with_force_unlock(true), &fs, &clock, &logger);

        let report = driver
            .verify(&MockProducer::echo(), None, &Selection::All)
            .unwrap();
        assert!(report.passed());
        assert!(logger.contains("ignoring lock held by regenerate (pid 999999)"));
        // Verify never touches the lock file, stale or not.
        assert!(fs.get_file(Path::new("/data/.goldcheck.lock")).is_some());
    }

    #[test]
    fn test_timeout_marks_unscheduled_not_run() {
        let fs = fs_with(&[
            ("a.kt", "A"),
            ("b.kt", "B"),
            ("c.kt", "C"),
            ("d.kt", "D"),
            ("e.kt", "E"),
        ]);
        // Reads: start=0, then checks at 400, 800 (run), 1200 (expired).
        let clock = AdvancingClock::new(0, 400);
        let logger = MockLogger::new();
        let driver = HarnessDriver::new(
            config().with_jobs(1).with_timeout_sec(Some(1)),
            &fs,
            &clock,
            &logger,
        );

        let report = driver
            .verify(&MockProducer::echo(), None, &Selection::All)
            .unwrap();
        assert_eq!(report.results.len(), 5);
        assert_eq!(report.counts().missing_baseline, 2);
        assert_eq!(report.counts().not_run, 3);
        assert_eq!(
            report.results[4].outcome,
            ComparisonOutcome::NotRun {
                reason: NotRunReason::Timeout
            }
        );
        assert!(logger.contains("3 fixture(s) not run: suite timeout"));
    }

    #[test]
    fn test_shutdown_marks_everything_not_run() {
        let fs = fs_with(&[("a.kt", "A"), ("b.kt", "B")]);
        let clock = MockClock::new(T0);
        let flag = ShutdownFlag::new();
        flag.trigger();
        let producer = MockProducer::echo();
        let driver =
            HarnessDriver::new(config(), &fs, &clock, &NullLogger).with_shutdown(&flag);

        let report = driver.verify(&producer, None, &Selection::All).unwrap();
        assert!(report
            .results
            .iter()
            .all(|r| r.outcome
                == ComparisonOutcome::NotRun {
                    reason: NotRunReason::Interrupted
                }));
        assert!(producer.calls().is_empty());
    }

    #[test]
    fn test_producer_factory_failure_is_fatal() {
        struct Broken;
        impl ProducerFactory for Broken {
            type Producer = MockProducer;
            fn create(&self) -> Result<MockProducer, ProducerError> {
                Err(ProducerError::Rejected("no toolchain".into()))
            }
        }

        let fs = fs_with(&[("a.kt", "A")]);
        let clock = MockClock::new(T0);
        let driver = HarnessDriver::new(config(), &fs, &clock, &NullLogger);
        let err = driver.verify(&Broken, None, &Selection::All).unwrap_err();
        assert!(matches!(err, HarnessError::Producer(_)));
        assert!(fs.get_file(Path::new("/data/.goldcheck.lock")).is_none());
    }

    // ===========================================
    // Producer panics
    // ===========================================

    type PanickyProducer = fn(&FixtureSource<'_>) -> Result<Artifact, ProducerError>;

    fn echo_panicking_on_b(source: &FixtureSource<'_>) -> Result<Artifact, ProducerError> {
        if source.fixture.relative_path == "b.kt" {
            panic!("internal compiler error in {}", source.fixture.relative_path);
        }
        Ok(Artifact::new(source.text))
    }

    /// Hands out `echo_panicking_on_b` until `limit` producers were created.
    struct PanickyFactory {
        created: AtomicUsize,
        limit: usize,
    }

    impl PanickyFactory {
        fn new(limit: usize) -> Self {
            Self {
                created: AtomicUsize::new(0),
                limit,
            }
        }

        fn created(&self) -> usize {
            self.created.load(Ordering::SeqCst)
        }
    }

    impl ProducerFactory for PanickyFactory {
        type Producer = PanickyProducer;

        fn create(&self) -> Result<PanickyProducer, ProducerError> {
            if self.created.fetch_add(1, Ordering::SeqCst) >= self.limit {
                return Err(ProducerError::Rejected("toolchain gone".into()));
            }
            Ok(echo_panicking_on_b)
        }
    }

    fn abc_fixtures() -> MockFilesystem {
        fs_with(&[
            ("a.kt", "A"),
            ("a.txt", "A\n"),
            ("b.kt", "B"),
            ("b.txt", "B\n"),
            ("c.kt", "C"),
            ("c.txt", "C\n"),
        ])
    }

    #[test]
    fn test_verify_producer_panic_is_per_fixture() {
        let fs = abc_fixtures();
        let clock = MockClock::new(T0);
        let logger = MockLogger::new();
        let factory = PanickyFactory::new(usize::MAX);
        let driver = HarnessDriver::new(config().with_jobs(1), &fs, &clock, &logger);

        let report = driver.verify(&factory, None, &Selection::All).unwrap();

        let outcomes: Vec<_> = report.results.iter().map(|r| &r.outcome).collect();
        assert_eq!(outcomes[0], &ComparisonOutcome::Match);
        assert_eq!(
            outcomes[1],
            &ComparisonOutcome::ProducerError {
                detail: "producer panicked: internal compiler error in b.kt".into()
            }
        );
        // The worker keeps going with a rebuilt producer.
        assert_eq!(outcomes[2], &ComparisonOutcome::Match);
        assert_eq!(factory.created(), 2);
        assert_eq!(report.counts().producer_errors, 1);
        assert!(!report.passed());
        assert!(logger.contains("producer panicked on b.kt"));
    }

    #[test]
    fn test_verify_producer_panic_with_parallel_workers() {
        let fs = abc_fixtures();
        let clock = MockClock::new(T0);
        let driver = HarnessDriver::new(config().with_jobs(3), &fs, &clock, &NullLogger);

        let report = driver
            .verify(&PanickyFactory::new(usize::MAX), None, &Selection::All)
            .unwrap();
        let counts = report.counts();
        assert_eq!(counts.matched, 2);
        assert_eq!(counts.producer_errors, 1);
        assert_eq!(report.results[1].fixture.relative_path, "b.kt");
    }

    #[test]
    fn test_regenerate_producer_panic_is_per_fixture() {
        let fs = fs_with(&[("a.kt", "A"), ("b.kt", "B"), ("c.kt", "C")]);
        let clock = MockClock::new(T0);
        let driver = HarnessDriver::new(config().with_jobs(1), &fs, &clock, &NullLogger);

        let regen = driver
            .regenerate(&PanickyFactory::new(usize::MAX), &Selection::All)
            .unwrap();

        assert_eq!(regen.results[0].outcome, RegenOutcome::Created);
        assert!(matches!(
            &regen.results[1].outcome,
            RegenOutcome::ProducerError { detail } if detail.contains("internal compiler error")
        ));
        assert_eq!(regen.results[2].outcome, RegenOutcome::Created);
        assert!(fs.get_file(Path::new("/data/b.txt")).is_none());
        assert_eq!(fs.get_text(Path::new("/data/c.txt")).as_deref(), Some("C\n"));
        assert!(fs.get_file(Path::new("/data/.goldcheck.lock")).is_none());
    }

    #[test]
    fn test_failed_producer_rebuild_is_fatal() {
        let fs = abc_fixtures();
        let clock = MockClock::new(T0);
        let factory = PanickyFactory::new(1);
        let driver = HarnessDriver::new(config().with_jobs(1), &fs, &clock, &NullLogger);

        let err = driver.verify(&factory, None, &Selection::All).unwrap_err();
        assert!(matches!(err, HarnessError::Producer(ProducerError::Rejected(_))));
        assert_eq!(factory.created(), 2);
    }

    // ===========================================
    // Regenerate
    // ===========================================

    #[test]
    fn test_regenerate_then_verify_matches() {
        let fs = fs_with(&[("a.kt", "A"), ("nested/b.kt", "B"), ("nested/b.txt", "stale\n")]);
        let clock = MockClock::new(T0);
        let driver = HarnessDriver::new(config(), &fs, &clock, &NullLogger);
        let producer = MockProducer::echo();

        let regen = driver.regenerate(&producer, &Selection::All).unwrap();
        assert!(regen.passed());
        let counts = regen.counts();
        assert_eq!((counts.created, counts.updated), (1, 1));

        let again = driver.regenerate(&producer, &Selection::All).unwrap();
        assert_eq!(again.counts().unchanged, 2);

        let report = driver.verify(&producer, None, &Selection::All).unwrap();
        assert!(report.passed());
    }

    #[test]
    fn test_regenerate_selected_only() {
        let fs = fs_with(&[("a.kt", "A"), ("b.kt", "B")]);
        let clock = MockClock::new(T0);
        let driver = HarnessDriver::new(config(), &fs, &clock, &NullLogger);

        let regen = driver
            .regenerate(&MockProducer::echo(), &Selection::Ids(vec!["testB".into()]))
            .unwrap();
        assert_eq!(regen.results.len(), 1);
        assert!(fs.get_file(Path::new("/data/a.txt")).is_none());
        assert_eq!(fs.get_text(Path::new("/data/b.txt")).as_deref(), Some("B\n"));
    }

    #[test]
    fn test_regenerate_busy_until_forced() {
        let fs = fs_with(&[("a.kt", "A"), (".goldcheck.lock", "regenerate 999999\n")]);
        let clock = MockClock::new(T0);
        let producer = MockProducer::echo();

        let driver = HarnessDriver::new(config(), &fs, &clock, &NullLogger);
        assert!(matches!(
            driver.regenerate(&producer, &Selection::All),
            Err(HarnessError::RootBusy { .. })
        ));
        assert!(fs.get_file(Path::new("/data/a.txt")).is_none());

        let forced = HarnessDriver::new(config().with_force_unlock(true), &fs, &clock, &NullLogger);
        let regen = forced.regenerate(&producer, &Selection::All).unwrap();
        assert_eq!(regen.counts().created, 1);
        assert!(fs.get_file(Path::new("/data/.goldcheck.lock")).is_none());
    }
}
