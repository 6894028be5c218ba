//! goldcheck CLI.
//!
//! Command-line front end for the `goldcheck` binary.

pub mod cli;
pub mod commands;
pub mod config_file;
pub mod exit;
pub mod settings;
pub mod signal;

pub use cli::{
    parse_from, Cli, CliError, Command, CommonArgs, ListArgs, RegenerateArgs, RunArgs, VerifyArgs,
};
pub use commands::list::{format_listing, prepare_list};
pub use commands::regenerate::prepare_regenerate;
pub use commands::verify::prepare_verify;
pub use commands::{
    execute_list, execute_regenerate, execute_verify, CommandError, CommandResult,
    RegenerateResult, VerifyResult,
};
pub use config_file::{load_config_file, ConfigFile, ConfigFileError, ProducerConfig};
pub use settings::Settings;
