//! List command orchestration.

use goldcheck_clock::Clock;
use goldcheck_fs::Filesystem;
use goldcheck_harness::{HarnessDriver, Logger};
use goldcheck_schema::Fixture;

use crate::cli::ListArgs;
use crate::settings::Settings;

use super::{load_settings, CommandResult};

/// Resolve settings for the list command. No producer is needed.
pub fn prepare_list<F: Filesystem>(args: &ListArgs, fs: &F) -> CommandResult<Settings> {
    load_settings(&args.common, None, fs)
}

/// Discover fixtures and derive their identifiers, in path order.
pub fn execute_list<F, C, L>(
    settings: &Settings,
    fs: &F,
    clock: &C,
    logger: &L,
) -> CommandResult<Vec<Fixture>>
where
    F: Filesystem,
    C: Clock,
    L: Logger,
{
    let driver = HarnessDriver::new(settings.harness.clone(), fs, clock, logger);
    Ok(driver.scan()?)
}

/// One `identifier<TAB>relative path` line per fixture.
pub fn format_listing(fixtures: &[Fixture]) -> String {
    fixtures
        .iter()
        .map(|f| format!("{}\t{}\n", f.derived_id, f.relative_path))
        .collect()
}
