//! Errors raised by the stub servers.

use std::io;

use camino::Utf8PathBuf;
use minicluster::{HostPort, HostPortParseError, TelemetryError};
use thiserror::Error;

/// Failures that stop a stub daemon.
#[derive(Debug, Error)]
pub enum StubError {
    /// The permanent id could not be read or persisted.
    #[error("failed to load instance id under '{path}': {source}")]
    Identity {
        /// Data directory.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A listener could not bind.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Requested address.
        address: HostPort,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bound address of a listener could not be read.
    #[error("failed to read listener address: {source}")]
    LocalAddress {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A listener could not be switched to non-blocking mode.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A peer address did not resolve.
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        /// Peer address.
        address: HostPort,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// An address list flag was malformed.
    #[error("invalid address list: {source}")]
    AddressList {
        /// Parse failure.
        #[source]
        source: HostPortParseError,
    },
    /// The requested status format is not JSON.
    #[error("unsupported status format '{format}'")]
    UnsupportedFormat {
        /// Requested format.
        format: String,
    },
    /// The status artefact could not be written.
    #[error("failed to write status artefact '{path}': {source}")]
    WriteStatus {
        /// Artefact path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// A background thread panicked.
    #[error("{name} thread panicked")]
    ThreadPanic {
        /// Thread purpose.
        name: &'static str,
    },
}

impl From<HostPortParseError> for StubError {
    fn from(source: HostPortParseError) -> Self {
        Self::AddressList { source }
    }
}
