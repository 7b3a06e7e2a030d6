//! Errors raised by cluster orchestration.

use std::io;
use std::time::Duration;

use camino::Utf8PathBuf;
use minicluster_config::ConfigurationError;
use thiserror::Error;

use crate::daemon::DaemonError;
use crate::rpc::RpcError;

/// Failures of [`ClusterController`](super::ClusterController) operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// `start` was called on a running cluster.
    #[error("cluster is already started")]
    AlreadyStarted,
    /// The operation needs a started cluster.
    #[error("cluster is not started")]
    NotStarted,
    /// The options describe an impossible topology.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The directory of the running executable could not be determined.
    #[error("failed to locate daemon binaries: {source}")]
    BinaryRoot {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The data root could not be determined or created.
    #[error("failed to prepare data root '{path}': {source}")]
    DataRoot {
        /// Data root.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A worker was requested before any coordinator exists.
    #[error("no coordinator is running")]
    NoCoordinators,
    /// A coordinator failed to start.
    #[error("failed to start coordinator {index}: {source}")]
    StartCoordinator {
        /// Coordinator index.
        index: usize,
        /// Daemon failure.
        #[source]
        source: DaemonError,
    },
    /// A worker failed to start.
    #[error("failed to start worker {index}: {source}")]
    StartWorker {
        /// Worker index.
        index: usize,
        /// Daemon failure.
        #[source]
        source: DaemonError,
    },
    /// A coordinator's RPC address is not available.
    #[error("coordinator {index} has no usable rpc address: {source}")]
    CoordinatorAddress {
        /// Coordinator index.
        index: usize,
        /// Daemon failure.
        #[source]
        source: DaemonError,
    },
    /// The coordinator index is out of range.
    #[error("no coordinator at index {index}")]
    UnknownCoordinator {
        /// Requested index.
        index: usize,
    },
    /// A membership call failed.
    #[error("membership rpc failed: {source}")]
    Rpc {
        /// RPC failure.
        #[source]
        source: RpcError,
    },
    /// Workers did not all register in time.
    #[error("{matched} of {expected} workers registered within {timeout:?}")]
    Timeout {
        /// Workers expected.
        expected: usize,
        /// Workers matched in the last successful listing.
        matched: usize,
        /// Budget that elapsed.
        timeout: Duration,
    },
}

impl From<RpcError> for ClusterError {
    fn from(source: RpcError) -> Self {
        Self::Rpc { source }
    }
}
