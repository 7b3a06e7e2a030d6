//! Options describing the shape of an ephemeral cluster.
//!
//! [`ClusterOptions`] is the only input the cluster controller needs. Test
//! drivers usually build it in code with struct update syntax over
//! [`ClusterOptions::default`], but the same structure loads through
//! `ortho_config`, so defaults can be layered with a configuration file,
//! `MINICLUSTER_*` environment variables, and command-line flags.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defaults::{
    DEFAULT_NUM_COORDINATORS, DEFAULT_NUM_WORKERS, DEFAULT_REGISTRATION_TIMEOUT_MS,
    DEFAULT_STARTUP_TIMEOUT_MS, default_coordinator_binary, default_log_filter_string,
    default_log_format, default_worker_binary,
};
use crate::logging::LogFormat;

/// Placeholder substituted with an instance's numeric index in extra flags.
pub const INDEX_PLACEHOLDER: &str = "${index}";

/// Declarative description of a test cluster.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "MINICLUSTER")]
pub struct ClusterOptions {
    /// Number of coordinator processes. More than one selects the
    /// leader/follower topology and requires `coordinator_rpc_ports`.
    #[ortho_config(default = DEFAULT_NUM_COORDINATORS)]
    pub num_coordinators: usize,
    /// Number of worker processes started after the coordinators.
    #[ortho_config(default = DEFAULT_NUM_WORKERS)]
    pub num_workers: usize,
    /// Directory holding the daemon binaries. Defaults to the directory of
    /// the running executable.
    pub daemon_bin_path: Option<Utf8PathBuf>,
    /// Root directory for per-daemon data directories. Defaults to a
    /// process-scoped directory under the system temporary directory.
    pub data_root: Option<Utf8PathBuf>,
    /// Fixed loopback RPC ports, one per coordinator, for the distributed
    /// topology.
    #[serde(default)]
    pub coordinator_rpc_ports: Vec<u16>,
    /// Flags appended to every coordinator command line. May contain
    /// [`INDEX_PLACEHOLDER`].
    #[serde(default)]
    pub extra_coordinator_flags: Vec<String>,
    /// Flags appended to every worker command line. May contain
    /// [`INDEX_PLACEHOLDER`].
    #[serde(default)]
    pub extra_worker_flags: Vec<String>,
    /// File name of the coordinator binary inside `daemon_bin_path`.
    #[ortho_config(default = default_coordinator_binary())]
    pub coordinator_binary: String,
    /// File name of the worker binary inside `daemon_bin_path`.
    #[ortho_config(default = default_worker_binary())]
    pub worker_binary: String,
    /// Milliseconds a daemon may take to publish its status artefact.
    #[ortho_config(default = DEFAULT_STARTUP_TIMEOUT_MS)]
    pub startup_timeout_ms: u64,
    /// Milliseconds the cluster waits for all workers to register.
    #[ortho_config(default = DEFAULT_REGISTRATION_TIMEOUT_MS)]
    pub registration_timeout_ms: u64,
    /// Tracing filter expression for harness telemetry.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for harness telemetry.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            num_coordinators: DEFAULT_NUM_COORDINATORS,
            num_workers: DEFAULT_NUM_WORKERS,
            daemon_bin_path: None,
            data_root: None,
            coordinator_rpc_ports: Vec::new(),
            extra_coordinator_flags: Vec::new(),
            extra_worker_flags: Vec::new(),
            coordinator_binary: default_coordinator_binary(),
            worker_binary: default_worker_binary(),
            startup_timeout_ms: DEFAULT_STARTUP_TIMEOUT_MS,
            registration_timeout_ms: DEFAULT_REGISTRATION_TIMEOUT_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl ClusterOptions {
    /// Loads options from defaults, configuration files, the environment, and
    /// the supplied command-line arguments (`args[0]` is the program name).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Load`] when any source is malformed.
    pub fn load_with_args<I>(args: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = OsString>,
    {
        Self::load_from_iter(args).map_err(ConfigurationError::Load)
    }

    /// Budget for a single daemon to report readiness.
    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Budget for the convergence wait after all workers have started.
    #[must_use]
    pub const fn registration_timeout(&self) -> Duration {
        Duration::from_millis(self.registration_timeout_ms)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Telemetry output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Validates the coordinator topology without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Fails when no coordinators are requested, or when a multi-coordinator
    /// cluster does not supply exactly one RPC port per coordinator.
    pub fn topology(&self) -> Result<Topology, ConfigurationError> {
        match self.num_coordinators {
            0 => Err(ConfigurationError::NoCoordinators),
            1 => Ok(Topology::Single),
            coordinators if self.coordinator_rpc_ports.len() != coordinators => {
                Err(ConfigurationError::CoordinatorPortCount {
                    coordinators,
                    ports: self.coordinator_rpc_ports.len(),
                })
            }
            _ => Ok(Topology::Distributed {
                rpc_ports: self.coordinator_rpc_ports.clone(),
            }),
        }
    }
}

/// Coordinator arrangement derived from [`ClusterOptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// One coordinator bound to an ephemeral loopback port.
    Single,
    /// A leader at index 0 plus followers, each on a fixed loopback port.
    Distributed {
        /// One RPC port per coordinator, leader first.
        rpc_ports: Vec<u16>,
    },
}

/// Errors raised while loading or validating cluster options.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The cluster needs at least one coordinator to act as leader.
    #[error("at least one coordinator is required")]
    NoCoordinators,
    /// Distributed coordinators need one fixed port each.
    #[error(
        "{coordinators} coordinators requested, but {ports} ports specified in 'coordinator_rpc_ports'"
    )]
    CoordinatorPortCount {
        /// Requested coordinator count.
        coordinators: usize,
        /// Number of ports supplied.
        ports: usize,
    },
    /// Loading layered configuration failed.
    #[error("failed to load cluster options: {0}")]
    Load(#[source] Arc<OrthoError>),
}
