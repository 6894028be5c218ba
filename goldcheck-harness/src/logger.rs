//! Run logging.
//!
//! Loggers are passed to the driver explicitly; there is no global logger.
//! Warnings are always shown, the other levels are gated by [`Verbosity`].

use std::io::Write;
use std::sync::{Arc, RwLock};

/// Verbosity threshold, from `-v` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Summary lines and warnings.
    Normal,
    /// Per-fixture outcomes (`-v`).
    Verbose,
    /// Timings and internal decisions (`-vv`).
    Debug,
}

impl Verbosity {
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }
}

/// Severity of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warn,
    Info,
    Verbose,
    Debug,
}

impl Level {
    /// Lowest verbosity at which this level is shown.
    fn threshold(self) -> Verbosity {
        match self {
            Level::Warn | Level::Info => Verbosity::Normal,
            Level::Verbose => Verbosity::Verbose,
            Level::Debug => Verbosity::Debug,
        }
    }
}

/// Sink for run progress.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    /// Problems that do not abort the run, such as completeness violations.
    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn verbose(&self, message: &str) {
        self.log(Level::Verbose, message);
    }

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }
}

/// Writes to stderr, keeping stdout free for listings.
#[derive(Debug)]
pub struct StderrLogger {
    verbosity: Verbosity,
}

impl StderrLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: Level, message: &str) {
        if level.threshold() > self.verbosity {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = match level {
            Level::Warn => writeln!(stderr, "warning: {}", message),
            _ => writeln!(stderr, "{}", message),
        };
    }
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Captures every message regardless of verbosity.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    pub fn contains(&self, substring: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(substring))
    }

    /// Index of the first message containing `substring`.
    pub fn position(&self, substring: &str) -> Option<usize> {
        self.entries()
            .iter()
            .position(|e| e.message.contains(substring))
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Level, message: &str) {
        self.entries.write().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Level, _message: &str) {}
}
