//! Regenerate command orchestration.

use goldcheck_clock::Clock;
use goldcheck_fs::Filesystem;
use goldcheck_harness::{render_regen, HarnessDriver, Logger, ProducerFactory, ShutdownCheck};
use goldcheck_schema::{NotRunReason, RegenOutcome, RegenReport};

use crate::cli::RegenerateArgs;
use crate::settings::Settings;

use super::{load_settings, write_output, CommandResult};

/// Result of regenerate command execution.
#[derive(Debug)]
pub struct RegenerateResult {
    pub report: RegenReport,
    pub rendered: String,
}

impl RegenerateResult {
    pub fn interrupted(&self) -> bool {
        self.report.results.iter().any(|r| {
            r.outcome
                == RegenOutcome::NotRun {
                    reason: NotRunReason::Interrupted,
                }
        })
    }
}

/// Validate arguments (including `--yes`) and resolve effective settings.
pub fn prepare_regenerate<F: Filesystem>(
    args: &RegenerateArgs,
    fs: &F,
) -> CommandResult<Settings> {
    args.validate()?;
    let settings = load_settings(&args.common, Some(&args.run), fs)?;
    settings.require_producer()?;
    Ok(settings)
}

/// Execute the regenerate command.
pub fn execute_regenerate<PF, F, C, L>(
    args: &RegenerateArgs,
    settings: &Settings,
    factory: &PF,
    fs: &F,
    clock: &C,
    logger: &L,
    shutdown: &dyn ShutdownCheck,
) -> CommandResult<RegenerateResult>
where
    PF: ProducerFactory,
    F: Filesystem,
    C: Clock,
    L: Logger,
{
    let driver =
        HarnessDriver::new(settings.harness.clone(), fs, clock, logger).with_shutdown(shutdown);
    let report = driver.regenerate(factory, &settings.selection)?;
    let rendered = render_regen(&report);

    write_output(fs, args.run.report.as_deref(), &rendered)?;
    write_output(fs, args.run.json.as_deref(), &report.to_json())?;

    Ok(RegenerateResult { report, rendered })
}
