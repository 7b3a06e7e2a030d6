use crate::logging::LogFormat;

/// Default number of coordinator processes in a cluster.
pub const DEFAULT_NUM_COORDINATORS: usize = 1;

/// Default number of worker processes in a cluster.
pub const DEFAULT_NUM_WORKERS: usize = 1;

/// Binary launched for each coordinator unless overridden.
pub const DEFAULT_COORDINATOR_BINARY: &str = "coordinator-server";

/// Binary launched for each worker unless overridden.
pub const DEFAULT_WORKER_BINARY: &str = "worker-server";

/// How long a spawned daemon may take to publish its status artefact.
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 10_000;

/// How long the cluster waits for every worker to register.
pub const DEFAULT_REGISTRATION_TIMEOUT_MS: u64 = 10_000;

/// Default log filter expression used by the harness and stub servers.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the harness and stub servers.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Owned coordinator binary name used by the configuration loader.
#[must_use]
pub fn default_coordinator_binary() -> String {
    DEFAULT_COORDINATOR_BINARY.to_owned()
}

/// Owned worker binary name used by the configuration loader.
#[must_use]
pub fn default_worker_binary() -> String {
    DEFAULT_WORKER_BINARY.to_owned()
}
