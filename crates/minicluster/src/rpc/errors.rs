//! Failures of membership calls.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Failures of one membership call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The TCP connection could not be established.
    #[error("failed to connect to coordinator {addr}: {source}")]
    Connect {
        /// Coordinator address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading or writing the connection failed.
    #[error("i/o error talking to coordinator {addr}: {source}")]
    Io {
        /// Coordinator address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The request could not be serialised.
    #[error("failed to encode request for {addr}: {source}")]
    Encode {
        /// Coordinator address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The response line was not a valid message.
    #[error("failed to decode response from {addr}: {source}")]
    Decode {
        /// Coordinator address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The coordinator closed the connection without replying.
    #[error("coordinator {addr} closed the connection without a response")]
    Closed {
        /// Coordinator address.
        addr: SocketAddr,
    },
    /// The coordinator answered with an error.
    #[error("coordinator {addr} rejected the request: {message}")]
    Remote {
        /// Coordinator address.
        addr: SocketAddr,
        /// Reason reported by the coordinator.
        message: String,
    },
    /// The reply did not match the request.
    #[error("unexpected response from coordinator {addr}: {response}")]
    UnexpectedResponse {
        /// Coordinator address.
        addr: SocketAddr,
        /// Debug rendering of the reply.
        response: String,
    },
    /// No time was left for the call.
    #[error("call to coordinator {addr} timed out")]
    TimedOut {
        /// Coordinator address.
        addr: SocketAddr,
    },
}
