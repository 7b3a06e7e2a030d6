//! Shared configuration for the minicluster harness.
//!
//! The harness and the stub servers agree on option names, defaults, and the
//! telemetry format through this crate. [`ClusterOptions`] describes how many
//! coordinators and workers to launch, where to find their binaries, and
//! which extra flags each instance receives.

mod defaults;
mod logging;
mod options;

pub use defaults::{
    DEFAULT_COORDINATOR_BINARY, DEFAULT_LOG_FILTER, DEFAULT_NUM_COORDINATORS, DEFAULT_NUM_WORKERS,
    DEFAULT_REGISTRATION_TIMEOUT_MS, DEFAULT_STARTUP_TIMEOUT_MS, DEFAULT_WORKER_BINARY,
    default_coordinator_binary, default_log_filter, default_log_filter_string,
    default_log_format, default_worker_binary,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use options::{ClusterOptions, ConfigurationError, INDEX_PLACEHOLDER, Topology};
