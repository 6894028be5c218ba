//! Verify command orchestration.

use goldcheck_clock::Clock;
use goldcheck_fs::Filesystem;
use goldcheck_harness::{
    load_registry, render_suite, HarnessDriver, Logger, ProducerFactory, ShutdownCheck,
};
use goldcheck_schema::{ComparisonOutcome, NotRunReason, SuiteReport};

use crate::cli::VerifyArgs;
use crate::settings::Settings;

use super::{load_settings, write_output, CommandResult};

/// Result of verify command execution.
#[derive(Debug)]
pub struct VerifyResult {
    pub report: SuiteReport,
    /// Markdown rendering of `report`.
    pub rendered: String,
}

impl VerifyResult {
    /// Whether the run stopped early on Ctrl+C.
    pub fn interrupted(&self) -> bool {
        self.report.results.iter().any(|r| {
            r.outcome
                == ComparisonOutcome::NotRun {
                    reason: NotRunReason::Interrupted,
                }
        })
    }
}

/// Validate arguments and resolve effective settings.
pub fn prepare_verify<F: Filesystem>(args: &VerifyArgs, fs: &F) -> CommandResult<Settings> {
    args.validate()?;
    let settings = load_settings(&args.common, Some(&args.run), fs)?
        .with_registry(args.registry.clone())
        .with_reverse_check_flag(args.reverse_check);
    settings.require_producer()?;
    Ok(settings)
}

/// Execute the verify command.
///
/// Loads the registry when one is configured, runs the suite and writes the
/// optional Markdown and JSON reports. Baselines are never written.
pub fn execute_verify<PF, F, C, L>(
    args: &VerifyArgs,
    settings: &Settings,
    factory: &PF,
    fs: &F,
    clock: &C,
    logger: &L,
    shutdown: &dyn ShutdownCheck,
) -> CommandResult<VerifyResult>
where
    PF: ProducerFactory,
    F: Filesystem,
    C: Clock,
    L: Logger,
{
    let registry = match &settings.registry {
        Some(path) => {
            logger.debug(&format!("loading registry {}", path.display()));
            Some(load_registry(fs, path)?)
        }
        None => None,
    };

    let driver =
        HarnessDriver::new(settings.harness.clone(), fs, clock, logger).with_shutdown(shutdown);
    let report = driver.verify(factory, registry.as_ref(), &settings.selection)?;
    let rendered = render_suite(&report);

    write_output(fs, args.run.report.as_deref(), &rendered)?;
    write_output(fs, args.run.json.as_deref(), &report.to_json())?;

    Ok(VerifyResult { report, rendered })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{parse_from, CliError, Command};
    use crate::commands::CommandError;
    use goldcheck_clock::MockClock;
    use goldcheck_fs::MockFilesystem;
    use goldcheck_harness::{HarnessError, MockLogger, MockProducer, NeverShutdown, ShutdownFlag};
    use std::path::Path;

    const T0: u64 = 1_767_225_600_000;

    fn verify_args(extra: &[&str]) -> VerifyArgs {
        let mut argv = vec!["goldcheck", "verify", "--root", "/data", "--producer", "cat"];
        argv.extend_from_slice(extra);
        match parse_from(argv).unwrap().command {
            Command::Verify(args) => args,
            other => panic!("expected verify, got {other:?}"),
        }
    }

    fn fs_with(files: &[(&str, &str)]) -> MockFilesystem {
        let fs = MockFilesystem::new();
        fs.add_dir("/data");
        for (path, content) in files {
            fs.add_file(format!("/data/{}", path), *content);
        }
        fs
    }

    fn run(args: &VerifyArgs, fs: &MockFilesystem, producer: &MockProducer) -> CommandResult<VerifyResult> {
        let settings = prepare_verify(args, fs)?;
        let clock = MockClock::new(T0);
        let logger = MockLogger::new();
        execute_verify(args, &settings, producer, fs, &clock, &logger, &NeverShutdown)
    }

    // ===========================================
    // Preparation
    // ===========================================

    #[test]
    fn test_prepare_requires_producer() {
        let args = match parse_from(["goldcheck", "verify", "--root", "/data"]).unwrap().command {
            Command::Verify(args) => args,
            _ => unreachable!(),
        };
        let err = prepare_verify(&args, &MockFilesystem::new()).unwrap_err();
        assert!(matches!(
            err,
            CommandError::InvalidArgument(CliError::MissingProducer)
        ));
    }

    #[test]
    fn test_prepare_reads_config_file() {
        let fs = MockFilesystem::new();
        fs.add_file(
            "/repo/goldcheck.json",
            r#"{"root": "data", "registry": "registry.json", "producer": {"program": "dump"}}"#,
        );
        let args = match parse_from(["goldcheck", "verify", "-c", "/repo/goldcheck.json"])
            .unwrap()
            .command
        {
            Command::Verify(args) => args,
            _ => unreachable!(),
        };
        let settings = prepare_verify(&args, &fs).unwrap();
        assert_eq!(settings.harness.root, Path::new("/repo/data"));
        assert_eq!(settings.registry.as_deref(), Some(Path::new("/repo/registry.json")));
    }

    #[test]
    fn test_prepare_missing_config_file() {
        let args = verify_args(&["--config", "/none.json"]);
        assert!(matches!(
            prepare_verify(&args, &MockFilesystem::new()),
            Err(CommandError::Config(_))
        ));
    }

    // ===========================================
    // Execution
    // ===========================================

    #[test]
    fn test_all_match_passes() {
        let fs = fs_with(&[("a.kt", "A"), ("a.txt", "A\n")]);
        let result = run(&verify_args(&[]), &fs, &MockProducer::echo()).unwrap();
        assert!(result.report.passed());
        assert!(!result.interrupted());
        assert!(result.rendered.contains("**Result**: PASSED"));
    }

    #[test]
    fn test_writes_report_files_but_no_baselines() {
        let fs = fs_with(&[("a.kt", "A")]);
        let args = verify_args(&["--report", "/out/report.md", "--json", "/out/report.json"]);
        let result = run(&args, &fs, &MockProducer::echo()).unwrap();

        assert!(!result.report.passed());
        assert!(fs.get_text(Path::new("/data/a.txt")).is_none());
        let md = fs.get_text(Path::new("/out/report.md")).unwrap();
        assert!(md.contains("## Missing baselines"));
        let json = fs.get_text(Path::new("/out/report.json")).unwrap();
        assert!(json.contains("\"missing_baseline\""));
    }

    #[test]
    fn test_registry_loaded_and_checked() {
        let fs = fs_with(&[("a.kt", "A"), ("a.txt", "A\n"), ("b.kt", "B"), ("b.txt", "B\n")]);
        fs.add_file(
            "/registry.json",
            r#"{"version": 1, "entries": [{"id": "testA", "fixture": "a.kt"}]}"#,
        );
        let args = verify_args(&["--registry", "/registry.json"]);
        let result = run(&args, &fs, &MockProducer::echo()).unwrap();

        assert_eq!(result.report.completeness.violation_count(), 1);
        assert!(!result.report.passed());
    }

    #[test]
    fn test_unreadable_registry_is_fatal() {
        let fs = fs_with(&[("a.kt", "A")]);
        let args = verify_args(&["--registry", "/missing.json"]);
        assert!(matches!(
            run(&args, &fs, &MockProducer::echo()),
            Err(CommandError::Registry(_))
        ));
    }

    #[test]
    fn test_unknown_only_is_harness_error() {
        let fs = fs_with(&[("a.kt", "A")]);
        let args = verify_args(&["--only", "testNope"]);
        assert!(matches!(
            run(&args, &fs, &MockProducer::echo()),
            Err(CommandError::Harness(HarnessError::UnknownFixture(_)))
        ));
    }

    #[test]
    fn test_interrupted_run() {
        let fs = fs_with(&[("a.kt", "A"), ("a.txt", "A\n")]);
        let args = verify_args(&[]);
        let settings = prepare_verify(&args, &fs).unwrap();
        let clock = MockClock::new(T0);
        let logger = MockLogger::new();
        let shutdown = ShutdownFlag::new();
        shutdown.trigger();

        let result = execute_verify(
            &args,
            &settings,
            &MockProducer::echo(),
            &fs,
            &clock,
            &logger,
            &shutdown,
        )
        .unwrap();
        assert!(result.interrupted());
        assert!(!result.report.passed());
    }
}
