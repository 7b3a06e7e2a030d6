//! Errors raised while supervising a single daemon.

use std::io;
use std::time::Duration;

use camino::Utf8PathBuf;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use thiserror::Error;

/// Failures of one daemon's lifecycle operations.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// `start` was called while a process is already tracked.
    #[error("daemon '{exe}' is already running")]
    AlreadyRunning {
        /// Daemon binary.
        exe: Utf8PathBuf,
    },
    /// The data directory could not be created or opened.
    #[error("failed to prepare data directory '{path}': {source}")]
    DataDirectory {
        /// Data directory.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A status artefact from a previous run could not be deleted.
    #[error("failed to remove stale status artefact in '{path}': {source}")]
    RemoveStaleStatus {
        /// Data directory.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The stdout capture file could not be opened.
    #[error("failed to open stdout capture '{path}': {source}")]
    StdoutCapture {
        /// Capture file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Process creation failed.
    #[error("failed to start '{exe}': {source}")]
    StartFailure {
        /// Daemon binary.
        exe: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Polling the child for exit failed.
    #[error("failed to monitor '{exe}': {source}")]
    MonitorChild {
        /// Daemon binary.
        exe: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The process exited before it wrote its status artefact.
    #[error("'{exe}' exited before reporting ready (exit code: {exit_code:?}, signal: {signal:?})")]
    ProcessExitedEarly {
        /// Daemon binary.
        exe: Utf8PathBuf,
        /// Exit code, when the process exited normally.
        exit_code: Option<i32>,
        /// Terminating signal, when the process was killed.
        signal: Option<i32>,
    },
    /// The status artefact did not appear in time; the process was killed.
    #[error("timed out after {timeout:?} waiting for '{exe}' to write '{path}'")]
    StartupTimeout {
        /// Daemon binary.
        exe: Utf8PathBuf,
        /// Expected artefact path.
        path: Utf8PathBuf,
        /// Startup budget that elapsed.
        timeout: Duration,
    },
    /// Reading the status artefact failed.
    #[error("failed to read status artefact '{path}': {source}")]
    ReadStatus {
        /// Artefact path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The status artefact exists but is not valid.
    #[error("corrupt status artefact '{path}': {source}")]
    CorruptStatusArtifact {
        /// Artefact path.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The operation needs a daemon that has reported ready.
    #[error("daemon '{exe}' has not been started")]
    NotStarted {
        /// Daemon binary.
        exe: Utf8PathBuf,
    },
    /// The status artefact listed no address of the requested kind.
    #[error("daemon '{exe}' reported no bound {kind} address")]
    MissingBoundAddress {
        /// Daemon binary.
        exe: Utf8PathBuf,
        /// `rpc` or `http`.
        kind: &'static str,
    },
    /// The call is not valid in the daemon's current state.
    #[error("illegal state for '{exe}': {reason}")]
    IllegalState {
        /// Daemon binary.
        exe: Utf8PathBuf,
        /// What was violated.
        reason: &'static str,
    },
    /// The bound RPC address could not be resolved.
    #[error("failed to resolve address '{address}': {source}")]
    AddressResolution {
        /// Address that failed to resolve.
        address: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Delivering a signal to the process failed.
    #[error("failed to send {signal} to pid {pid}: {source}")]
    Signal {
        /// Target process.
        pid: u32,
        /// Signal that failed.
        signal: Signal,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}
