//! Clock abstraction for goldcheck.
//!
//! Provides a trait for reading wall-clock time in milliseconds, with real and
//! mock implementations so suite deadlines and report timestamps can be
//! tested deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Trait for getting the current Unix time.
pub trait Clock: Send + Sync {
    /// Returns the current time as milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Real system clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // A clock set before 1970 reads as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Mock clock for testing with a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    millis: u64,
}

impl MockClock {
    /// Create a mock clock fixed at `millis`.
    pub fn new(millis: u64) -> Self {
        Self { millis }
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> u64 {
        self.millis
    }
}

/// Mock clock that auto-advances time on each call.
///
/// Lets tests drive a suite past its deadline without sleeping.
#[derive(Debug)]
pub struct AdvancingClock {
    millis: AtomicU64,
    increment: u64,
}

impl AdvancingClock {
    /// Create a clock starting at `millis` and moving forward by `increment` per read.
    pub fn new(millis: u64, increment: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
            increment,
        }
    }
}

impl Clock for AdvancingClock {
    fn now_millis(&self) -> u64 {
        self.millis.fetch_add(self.increment, Ordering::SeqCst)
    }
}

/// A point in time after which no new work may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at_millis: Option<u64>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { at_millis: None }
    }

    /// A deadline `timeout_ms` after `start_millis`.
    pub fn after(start_millis: u64, timeout_ms: u64) -> Self {
        Self {
            at_millis: Some(start_millis.saturating_add(timeout_ms)),
        }
    }

    /// Returns true once the clock has reached the deadline.
    pub fn expired<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        match self.at_millis {
            Some(at) => clock.now_millis() >= at,
            None => false,
        }
    }
}
