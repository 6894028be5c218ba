//! Effective run settings: config file values overridden by flags.

use std::path::PathBuf;

use goldcheck_harness::{CommandSpec, HarnessConfig, Selection, Verbosity};

use crate::cli::{CliError, CommonArgs, RunArgs};
use crate::config_file::ConfigFile;

/// Everything a command needs after merging flags and the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub harness: HarnessConfig,
    pub registry: Option<PathBuf>,
    pub producer: Option<CommandSpec>,
    pub selection: Selection,
    pub verbosity: Verbosity,
}

impl Settings {
    /// Merge `file` with command-line flags. Flags win.
    pub fn resolve(
        common: &CommonArgs,
        run: Option<&RunArgs>,
        file: ConfigFile,
    ) -> Result<Self, CliError> {
        let root = common
            .root
            .clone()
            .or(file.root)
            .ok_or(CliError::MissingRoot)?;

        let mut harness = HarnessConfig::new(root);
        if let Some(pattern) = common.pattern.clone().or(file.pattern) {
            harness = harness.with_pattern(pattern);
        }
        if common.no_recursive {
            harness = harness.with_recursive(false);
        } else if let Some(recursive) = file.recursive {
            harness = harness.with_recursive(recursive);
        }
        let excludes = if common.exclude.is_empty() {
            file.excludes
        } else {
            common.exclude.clone()
        };
        harness = harness.with_excludes(excludes);
        if let Some(ext) = common.baseline_ext.clone().or(file.baseline_extension) {
            harness = harness.with_baseline_extension(ext);
        }
        if let Some(prefix) = common.id_prefix.clone().or(file.id_prefix) {
            harness = harness.with_id_prefix(prefix);
        }
        if let Some(reverse) = file.reverse_check {
            harness = harness.with_reverse_check(reverse);
        }

        let mut producer = file.producer.map(|p| {
            let spec = CommandSpec::new(p.program).with_args(p.args);
            match p.working_dir {
                Some(dir) => spec.with_working_dir(dir),
                None => spec,
            }
        });
        let mut selection = Selection::All;

        if let Some(jobs) = run.and_then(|r| r.jobs).or(file.jobs) {
            harness = harness.with_jobs(jobs);
        }
        if let Some(timeout) = run.and_then(|r| r.timeout_sec).or(file.timeout_sec) {
            harness = harness.with_timeout_sec(Some(timeout));
        }
        if let Some(run) = run {
            if let Some(program) = &run.producer {
                producer = Some(CommandSpec::new(program.as_str()).with_args(run.producer_args.clone()));
            }
            if !run.only.is_empty() {
                selection = Selection::Ids(run.only.clone());
            }
            if run.force_unlock {
                harness = harness.with_force_unlock(true);
            }
        }

        Ok(Self {
            harness,
            registry: file.registry,
            producer,
            selection,
            verbosity: Verbosity::from_count(common.verbose),
        })
    }

    /// Override the registry path.
    pub fn with_registry(mut self, registry: Option<PathBuf>) -> Self {
        if registry.is_some() {
            self.registry = registry;
        }
        self
    }

    /// Turn on reverse checking when the flag is set.
    pub fn with_reverse_check_flag(mut self, flag: bool) -> Self {
        if flag {
            self.harness = self.harness.with_reverse_check(true);
        }
        self
    }

    /// The producer command, required for verify and regenerate.
    pub fn require_producer(&self) -> Result<&CommandSpec, CliError> {
        self.producer.as_ref().ok_or(CliError::MissingProducer)
    }
}
