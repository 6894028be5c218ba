//! Exit codes for the goldcheck CLI.
//!
//! 0 and 1 report the suite result; everything else is a fatal error that
//! kept the suite from producing a report.

use goldcheck_harness::HarnessError;

use crate::commands::CommandError;

/// Exit code constants.
pub mod codes {
    /// Suite passed.
    pub const SUCCESS: i32 = 0;
    /// Suite ran and at least one fixture or completeness check failed.
    pub const SUITE_FAILED: i32 = 1;
    /// Invalid arguments (same code clap uses for usage errors).
    pub const INVALID_ARGS: i32 = 2;
    /// Fixture root missing or unreadable.
    pub const DISCOVERY_ERROR: i32 = 3;
    /// Two fixtures derive the same identifier.
    pub const COLLISION: i32 = 4;
    /// Registry file unreadable or malformed.
    pub const REGISTRY_ERROR: i32 = 5;
    /// Another run holds the root.
    pub const ROOT_BUSY: i32 = 6;
    /// Invalid configuration.
    pub const CONFIG_ERROR: i32 = 7;
    /// IO error.
    pub const IO_ERROR: i32 = 8;
    /// The producer could not be set up.
    pub const PRODUCER_ERROR: i32 = 9;
    /// Internal failure.
    pub const INTERNAL_ERROR: i32 = 10;
    /// Interrupted by signal (128 + signal number).
    pub const SIGINT: i32 = 130;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) => codes::INVALID_ARGS,
        CommandError::Config(_) => codes::CONFIG_ERROR,
        CommandError::Registry(_) => codes::REGISTRY_ERROR,
        CommandError::Output { .. } => codes::IO_ERROR,
        CommandError::Harness(e) => match e {
            HarnessError::Config(_) => codes::CONFIG_ERROR,
            HarnessError::Discovery(_) => codes::DISCOVERY_ERROR,
            HarnessError::Collision(_) => codes::COLLISION,
            HarnessError::UnknownFixture(_) => codes::INVALID_ARGS,
            HarnessError::RootBusy { .. } => codes::ROOT_BUSY,
            HarnessError::Lock(_) => codes::IO_ERROR,
            HarnessError::Producer(_) => codes::PRODUCER_ERROR,
            HarnessError::WorkerPanicked => codes::INTERNAL_ERROR,
        },
    }
}
