//! Command-line argument parsing for the `goldcheck` binary.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use thiserror::Error;

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("no fixture root given; pass --root or set `root` in the config file")]
    MissingRoot,

    #[error("no producer given; pass --producer or set `producer` in the config file")]
    MissingProducer,

    #[error("regenerate rewrites baselines; pass --yes to confirm")]
    RegenerateNotConfirmed,

    #[error("--arg requires --producer")]
    ArgWithoutProducer,
}

/// Golden-master verification harness.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "goldcheck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Compare every fixture's output with its recorded baseline.
    Verify(VerifyArgs),
    /// Rewrite baselines from current producer output.
    Regenerate(RegenerateArgs),
    /// Print `identifier<TAB>path` for every discovered fixture.
    List(ListArgs),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct CommonArgs {
    /// Test-data root containing fixtures and baselines.
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// JSON config file; command-line flags override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Regex matched against fixture file names.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Only scan the top level of the root.
    #[arg(long)]
    pub no_recursive: bool,

    /// Glob (relative to the root) of fixtures to skip. Repeatable.
    #[arg(long, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Extension of baseline files.
    #[arg(long)]
    pub baseline_ext: Option<String>,

    /// Prefix of derived test identifiers.
    #[arg(long)]
    pub id_prefix: Option<String>,

    /// Verbosity (-v per-fixture outcomes, -vv debug).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

/// Options for commands that run the producer.
#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct RunArgs {
    /// Program that prints a fixture's artifact on stdout.
    #[arg(long)]
    pub producer: Option<String>,

    /// Producer argument; `{fixture}`, `{relative}` and `{id}` are substituted. Repeatable.
    #[arg(long = "arg", action = ArgAction::Append, allow_hyphen_values = true)]
    pub producer_args: Vec<String>,

    /// Worker threads.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Stop scheduling fixtures after this many seconds.
    #[arg(long)]
    pub timeout_sec: Option<u64>,

    /// Only run these fixtures (identifier or relative path). Repeatable.
    #[arg(long, action = ArgAction::Append)]
    pub only: Vec<String>,

    /// Write the Markdown report here.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write the JSON report here.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Run despite a regeneration lock left by a run that is gone.
    #[arg(long)]
    pub force_unlock: bool,
}

impl RunArgs {
    pub fn validate(&self) -> Result<(), CliError> {
        if self.producer.is_none() && !self.producer_args.is_empty() {
            return Err(CliError::ArgWithoutProducer);
        }
        Ok(())
    }
}

/// Arguments for the verify command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub run: RunArgs,

    /// Registry of generated test identifiers to cross-check against.
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Also report registry entries whose fixture no longer exists.
    #[arg(long)]
    pub reverse_check: bool,
}

impl VerifyArgs {
    pub fn validate(&self) -> Result<(), CliError> {
        self.run.validate()
    }
}

/// Arguments for the regenerate command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RegenerateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub run: RunArgs,

    /// Confirm that baselines may be overwritten.
    #[arg(long)]
    pub yes: bool,
}

impl RegenerateArgs {
    pub fn validate(&self) -> Result<(), CliError> {
        if !self.yes {
            return Err(CliError::RegenerateNotConfirmed);
        }
        self.run.validate()
    }
}

/// Arguments for the list command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Parse CLI arguments from an iterator (for testing).
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}
