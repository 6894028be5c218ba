//! Ctrl+C handling.
//!
//! Ctrl+C sets the shutdown flag. Fixtures already running finish; the
//! rest are reported as not run.

use goldcheck_harness::ShutdownFlag;

/// Register a SIGINT handler that triggers `flag`.
///
/// Registration errors are ignored (a handler may already be set); the flag
/// still works when triggered manually.
pub fn install_handler(flag: &ShutdownFlag) {
    let flag = flag.clone();
    let _ = ctrlc::set_handler(move || flag.trigger());
}
