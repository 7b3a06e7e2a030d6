//! Ephemeral multi-process test clusters.
//!
//! A [`ClusterController`] launches real coordinator and worker binaries on
//! the loopback interface, each with its own data directory, and blocks until
//! every worker has registered with the leader coordinator. Tests then drive
//! individual daemons through the [`Daemon`] trait: shut them down, restart
//! them on the same ports, or pause them with `SIGSTOP` to simulate a hung
//! server.
//!
//! Daemons report readiness by atomically writing a JSON status artefact
//! ([`ServerStatus`]) into their data directory. Membership is queried over a
//! line-delimited JSON protocol described in [`rpc`].
//!
//! Configuration comes from [`minicluster_config::ClusterOptions`], which
//! layers defaults, configuration files, `MINICLUSTER_*` environment
//! variables, and command-line flags.

mod cluster;
mod daemon;
pub mod flags;
mod net;
mod process;
pub mod rpc;
mod status;
pub mod telemetry;

pub use cluster::{
    ClusterController, ClusterError, ClusterState, CoordinatorPlan, DATA_DIR_NAME,
    REGISTRATION_POLL_INTERVAL, RPC_CONTEXT_NAME, SINGLE_COORDINATOR_DIR, coordinator_dir_name,
    count_matching, plan_coordinators, wait_for_worker_count, worker_dir_name,
};
pub use daemon::{
    Daemon, DaemonError, DaemonState, ExternalCoordinator, ExternalDaemon, ExternalWorker,
    READY_POLL_INTERVAL, STARTUP_TIMEOUT, STDOUT_FILE_NAME,
};
pub use net::{HostPort, HostPortParseError, LOOPBACK_HOST, join as join_hostports};
pub use process::ProcessHandle;
pub use status::{DaemonIdentity, STATUS_FILE_NAME, ServerStatus, write_status_atomic};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
