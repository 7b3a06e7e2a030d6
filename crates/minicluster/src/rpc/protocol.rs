//! Wire types and line framing for the membership protocol.

use std::io::{self, BufRead, Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::net::HostPort;
use crate::status::DaemonIdentity;

/// Upper bound on one JSON line.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Requests a coordinator understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RpcRequest {
    /// Heartbeat from a worker announcing its identity and RPC address.
    RegisterWorker {
        /// Identity of the registering incarnation.
        instance: DaemonIdentity,
        /// Address the worker serves RPC on.
        rpc_address: HostPort,
    },
    /// Asks for every registered worker.
    ListWorkers,
}

/// Coordinator replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RpcResponse {
    /// Registration accepted.
    Registered,
    /// Registered workers, in registration order.
    Workers {
        /// One entry per registered permanent id.
        workers: Vec<WorkerEntry>,
    },
    /// The request was rejected.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

/// One worker as seen by a coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEntry {
    /// Identity from the most recent registration.
    pub instance_id: DaemonIdentity,
    /// RPC address from the most recent registration.
    pub rpc_address: HostPort,
}

/// Writes `message` as one JSON line and flushes.
///
/// # Errors
///
/// Returns IO failures, and serialisation failures as `InvalidData`.
pub fn write_message<W: Write, T: Serialize>(writer: &mut W, message: &T) -> io::Result<()> {
    let mut line = serde_json::to_vec(message)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()
}

/// Reads one JSON line, returning `Ok(None)` at end of stream.
///
/// # Errors
///
/// Returns IO failures, oversized lines as `InvalidData`, and malformed JSON
/// as `InvalidData`.
pub fn read_message<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> io::Result<Option<T>> {
    let mut line = String::new();
    let limit = u64::try_from(MAX_MESSAGE_BYTES).unwrap_or(u64::MAX);
    let read = Read::take(&mut *reader, limit).read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    if !line.ends_with('\n') && read >= MAX_MESSAGE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "message exceeds maximum length",
        ));
    }
    serde_json::from_str(line.trim_end())
        .map(Some)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}
