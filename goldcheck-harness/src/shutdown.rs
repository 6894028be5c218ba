//! Cooperative cancellation of a suite run.
//!
//! The driver polls a [`ShutdownCheck`] before scheduling each fixture. A
//! fixture already handed to a producer always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Trait for checking whether the run should stop scheduling work.
pub trait ShutdownCheck: Send + Sync {
    fn should_stop(&self) -> bool;
}

/// Shared stop flag. Clones observe the same state, so one clone can live in
/// a Ctrl+C handler while the driver polls another.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl ShutdownCheck for ShutdownFlag {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Never requests shutdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverShutdown;

impl ShutdownCheck for NeverShutdown {
    fn should_stop(&self) -> bool {
        false
    }
}
