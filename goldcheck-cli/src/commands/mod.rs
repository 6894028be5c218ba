//! Command orchestration for CLI subcommands.
//!
//! Provides execute functions for:
//! - `verify` - Compare fixtures with their baselines
//! - `regenerate` - Rewrite baselines
//! - `list` - Print discovered fixtures

pub mod list;
pub mod regenerate;
pub mod verify;

pub use list::execute_list;
pub use regenerate::{execute_regenerate, RegenerateResult};
pub use verify::{execute_verify, VerifyResult};

use std::path::Path;

use goldcheck_fs::{Filesystem, FsError};
use goldcheck_harness::{HarnessError, RegistryError};
use thiserror::Error;

use crate::cli::{CliError, CommonArgs, RunArgs};
use crate::config_file::{load_config_file, ConfigFile, ConfigFileError};
use crate::settings::Settings;

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("config error: {0}")]
    Config(#[from] ConfigFileError),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to write {}: {source}", .path.display())]
    Output {
        path: std::path::PathBuf,
        #[source]
        source: FsError,
    },
}

/// Result of command execution.
pub type CommandResult<T> = Result<T, CommandError>;

/// Load the config file if one was named, then merge flags over it.
pub fn load_settings<F: Filesystem>(
    common: &CommonArgs,
    run: Option<&RunArgs>,
    fs: &F,
) -> CommandResult<Settings> {
    let file = match &common.config {
        Some(path) => load_config_file(fs, path)?,
        None => ConfigFile::default(),
    };
    Ok(Settings::resolve(common, run, file)?)
}

/// Write `content` to an optional output path.
fn write_output<F: Filesystem>(fs: &F, path: Option<&Path>, content: &str) -> CommandResult<()> {
    if let Some(path) = path {
        fs.write_atomic(path, content.as_bytes())
            .map_err(|e| CommandError::Output {
                path: path.to_path_buf(),
                source: e,
            })?;
    }
    Ok(())
}
