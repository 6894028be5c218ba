//! The system-under-test contract.
//!
//! An [`ArtifactProducer`] turns one fixture into its canonical text
//! artifact. Producers are not assumed to be thread-safe: each worker gets
//! its own from a [`ProducerFactory`].

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use goldcheck_fs::FsError;
use goldcheck_schema::{Artifact, Fixture};
use thiserror::Error;

/// Environment variable carrying the fixture identifier to producer commands.
pub const FIXTURE_ID_ENV: &str = "GOLDCHECK_FIXTURE_ID";

/// Errors raised while producing an artifact.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The system under test rejected the fixture.
    #[error("{0}")]
    Rejected(String),

    #[error("failed to read fixture {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("producer `{program}` not found")]
    NotFound { program: String },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("`{program}` wrote non-UTF-8 output")]
    InvalidOutput { program: String },
}

/// One fixture handed to a producer.
#[derive(Debug, Clone, Copy)]
pub struct FixtureSource<'a> {
    pub fixture: &'a Fixture,
    /// Absolute path of the fixture file.
    pub path: &'a Path,
    pub text: &'a str,
}

/// Produces the canonical artifact for a fixture.
pub trait ArtifactProducer {
    fn produce(&mut self, source: &FixtureSource<'_>) -> Result<Artifact, ProducerError>;
}

impl<T> ArtifactProducer for T
where
    T: FnMut(&FixtureSource<'_>) -> Result<Artifact, ProducerError>,
{
    fn produce(&mut self, source: &FixtureSource<'_>) -> Result<Artifact, ProducerError> {
        self(source)
    }
}

/// Creates one producer per worker.
pub trait ProducerFactory: Sync {
    type Producer: ArtifactProducer + Send;

    fn create(&self) -> Result<Self::Producer, ProducerError>;
}

impl<T, P> ProducerFactory for T
where
    T: Fn() -> P + Sync,
    P: ArtifactProducer + Send,
{
    type Producer = P;

    fn create(&self) -> Result<P, ProducerError> {
        Ok(self())
    }
}

// ===== Command producer =====

/// An external command that prints the artifact on stdout.
///
/// In `args`, `{fixture}` is replaced by the absolute fixture path,
/// `{relative}` by the path under the root and `{id}` by the identifier.
/// Without a `{fixture}` placeholder the path is appended as the last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Locate the executable: a path is taken as is (relative to
    /// `working_dir` when set), a bare name is searched on `PATH`.
    pub fn resolve_program(&self) -> Option<PathBuf> {
        let program = Path::new(&self.program);
        if program.as_os_str().is_empty() {
            return None;
        }
        if program.is_absolute() || program.components().count() > 1 {
            let candidate = match &self.working_dir {
                Some(dir) if program.is_relative() => dir.join(program),
                _ => program.to_path_buf(),
            };
            return is_executable(&candidate).then_some(candidate);
        }

        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths).find_map(|dir| {
            let candidate = dir.join(program);
            if is_executable(&candidate) {
                return Some(candidate);
            }
            #[cfg(windows)]
            {
                let exe = candidate.with_extension("exe");
                if exe.is_file() {
                    return Some(exe);
                }
            }
            None
        })
    }

    /// Arguments for one fixture, placeholders substituted.
    pub fn render_args(&self, source: &FixtureSource<'_>) -> Vec<String> {
        let path = source.path.to_string_lossy();
        let mut has_fixture = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                has_fixture |= arg.contains("{fixture}");
                arg.replace("{fixture}", &path)
                    .replace("{relative}", &source.fixture.relative_path)
                    .replace("{id}", &source.fixture.derived_id)
            })
            .collect();
        if !has_fixture {
            args.push(path.into_owned());
        }
        args
    }
}

impl ProducerFactory for CommandSpec {
    type Producer = CommandProducer;

    /// Fails when the program cannot be found, before any fixture runs.
    fn create(&self) -> Result<CommandProducer, ProducerError> {
        if self.resolve_program().is_none() {
            return Err(ProducerError::NotFound {
                program: self.program.clone(),
            });
        }
        Ok(CommandProducer { spec: self.clone() })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Runs a [`CommandSpec`] once per fixture.
#[derive(Debug, Clone)]
pub struct CommandProducer {
    spec: CommandSpec,
}

impl ArtifactProducer for CommandProducer {
    fn produce(&mut self, source: &FixtureSource<'_>) -> Result<Artifact, ProducerError> {
        let program = &self.spec.program;
        let mut command = Command::new(program);
        command
            .args(self.spec.render_args(source))
            .env(FIXTURE_ID_ENV, &source.fixture.derived_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.spec.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| ProducerError::Spawn {
            program: program.clone(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(ProducerError::Exit {
                program: program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map(Artifact::from)
            .map_err(|_| ProducerError::InvalidOutput {
                program: program.clone(),
            })
    }
}

// ===== Mock producer =====

#[derive(Debug, Default)]
struct MockState {
    outputs: BTreeMap<String, Result<String, String>>,
    echo: bool,
    calls: Vec<String>,
}

/// Scripted producer for tests.
///
/// Outputs are keyed by fixture relative path. Unknown fixtures fail unless
/// echo mode is on, in which case the fixture source is the artifact.
/// Clones share state, so a clone handed to the driver records calls visible
/// to the test.
#[derive(Debug, Clone, Default)]
pub struct MockProducer {
    state: Arc<Mutex<MockState>>,
}

impl MockProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A producer returning each fixture's source text.
    pub fn echo() -> Self {
        let producer = Self::default();
        producer.lock().echo = true;
        producer
    }

    pub fn with_output(self, relative_path: &str, text: &str) -> Self {
        self.set_output(relative_path, text);
        self
    }

    pub fn with_failure(self, relative_path: &str, message: &str) -> Self {
        self.lock()
            .outputs
            .insert(relative_path.to_string(), Err(message.to_string()));
        self
    }

    /// Replace the scripted output for a fixture.
    pub fn set_output(&self, relative_path: &str, text: &str) {
        self.lock()
            .outputs
            .insert(relative_path.to_string(), Ok(text.to_string()));
    }

    /// Relative paths produced so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the calls of the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ArtifactProducer for MockProducer {
    fn produce(&mut self, source: &FixtureSource<'_>) -> Result<Artifact, ProducerError> {
        let mut state = self.lock();
        let key = source.fixture.relative_path.clone();
        state.calls.push(key.clone());
        match state.outputs.get(&key) {
            Some(Ok(text)) => Ok(Artifact::new(text.as_str())),
            Some(Err(message)) => Err(ProducerError::Rejected(message.clone())),
            None if state.echo => Ok(Artifact::new(source.text)),
            None => Err(ProducerError::Rejected(format!("no scripted output for {}", key))),
        }
    }
}

impl ProducerFactory for MockProducer {
    type Producer = MockProducer;

    fn create(&self) -> Result<MockProducer, ProducerError> {
        Ok(self.clone())
    }
}
