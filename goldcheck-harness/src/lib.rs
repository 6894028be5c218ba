//! goldcheck harness
//!
//! Golden-master verification for tools whose output is a canonical text
//! listing (bytecode dumps, generated code, IR). The harness:
//!
//! 1. Discovers fixture files under a test-data root
//! 2. Derives a stable identifier for each fixture and rejects collisions
//! 3. Cross-checks discovered fixtures against a generated registry
//! 4. Runs the system under test on each fixture and compares the output to
//!    the recorded baseline, in parallel
//! 5. Regenerates baselines, only when asked to
//!
//! # Layout
//!
//! Each fixture `<dir>/<name>.kt` may have a sibling baseline
//! `<dir>/<name>.txt`. The fixture pattern and baseline extension are
//! configurable through [`HarnessConfig`].

pub mod baseline;
pub mod config;
pub mod diff;
pub mod discovery;
pub mod driver;
pub mod identifier;
pub mod lock;
pub mod logger;
pub mod normalize;
pub mod producer;
pub mod registry;
pub mod report;
pub mod runner;
pub mod shutdown;

pub use baseline::{BaselineError, BaselineStore, StoreOutcome};
pub use config::{ConfigError, HarnessConfig};
pub use diff::diff_artifacts;
pub use discovery::{discover, DiscoveredFile, DiscoveryConfig, DiscoveryError};
pub use driver::{HarnessDriver, HarnessError, Selection};
pub use identifier::{derive_all, derive_id, Collision, CollisionError};
pub use lock::{current_holder, ensure_not_regenerating, LockError, LockHolder, RunLock, LOCK_FILE_NAME};
pub use logger::{Level, LogEntry, Logger, MockLogger, NullLogger, StderrLogger, Verbosity};
pub use normalize::normalize;
pub use producer::{
    ArtifactProducer, CommandProducer, CommandSpec, FixtureSource, MockProducer, ProducerError,
    ProducerFactory, FIXTURE_ID_ENV,
};
pub use registry::{cross_check, load_registry, Registry, RegistryError};
pub use report::{format_timestamp, render_regen, render_suite};
pub use runner::CaseRunner;
pub use shutdown::{NeverShutdown, ShutdownCheck, ShutdownFlag};
