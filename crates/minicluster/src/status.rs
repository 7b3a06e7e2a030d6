//! Readiness artefact written by daemons once their listeners are bound.
//!
//! Daemons write the artefact with a temp-file-and-rename step, so the file
//! is either absent or complete. The harness deletes any stale copy before a
//! launch and treats the first appearance of the file as the readiness
//! signal.

use std::io::{self, Write};
use std::path::Path;

use cap_std::fs::Dir;
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::net::HostPort;

/// File name of the artefact inside a daemon's data directory.
pub const STATUS_FILE_NAME: &str = "info.json";

/// Permanent id plus per-launch sequence number of one daemon incarnation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DaemonIdentity {
    /// Id persisted in the data directory and reused across restarts.
    pub permanent_uuid: String,
    /// Increases on every launch of the same data directory.
    pub instance_seqno: u64,
}

impl DaemonIdentity {
    /// Builds an identity record.
    #[must_use]
    pub fn new(permanent_uuid: impl Into<String>, instance_seqno: u64) -> Self {
        Self {
            permanent_uuid: permanent_uuid.into(),
            instance_seqno,
        }
    }

    /// Strict equality on both components.
    ///
    /// A restarted daemon keeps its uuid but gets a new seqno, so a stale
    /// registration from the previous incarnation does not match.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self == other
    }
}

/// Deserialised readiness artefact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Addresses the RPC server bound to.
    #[serde(default)]
    pub bound_rpc_addresses: Vec<HostPort>,
    /// Addresses the HTTP server bound to.
    #[serde(default)]
    pub bound_http_addresses: Vec<HostPort>,
    /// Identity of the incarnation that wrote the artefact.
    pub node_instance: DaemonIdentity,
}

impl ServerStatus {
    /// First bound RPC address, if any.
    #[must_use]
    pub fn first_rpc(&self) -> Option<&HostPort> {
        self.bound_rpc_addresses.first()
    }

    /// First bound HTTP address, if any.
    #[must_use]
    pub fn first_http(&self) -> Option<&HostPort> {
        self.bound_http_addresses.first()
    }
}

/// Reads the artefact, returning `Ok(None)` while it has not appeared.
pub(crate) fn read_status(dir: &Dir) -> io::Result<Option<String>> {
    match dir.read_to_string(STATUS_FILE_NAME) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

/// Parses artefact content.
pub(crate) fn parse_status(content: &str) -> Result<ServerStatus, serde_json::Error> {
    serde_json::from_str(content)
}

/// Deletes a leftover artefact from a previous launch.
pub(crate) fn remove_stale_status(dir: &Dir) -> io::Result<()> {
    match dir.remove_file(STATUS_FILE_NAME) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

/// Serialises `status` to `path`, replacing any existing file atomically.
///
/// # Errors
///
/// Returns an IO error when serialisation, writing, or the final rename
/// fails, or when `path` has no parent directory.
pub fn write_status_atomic(path: &Path, status: &ServerStatus) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "status path did not have a parent directory",
        )
    })?;
    let payload = serde_json::to_vec(status).map_err(io::Error::other)?;

    let mut file = Builder::new()
        .prefix(".info")
        .suffix(".tmp")
        .tempfile_in(directory)?;
    file.write_all(&payload)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use cap_std::ambient_authority;
    use tempfile::TempDir;

    use super::*;

    fn sample() -> ServerStatus {
        ServerStatus {
            bound_rpc_addresses: vec![HostPort::loopback(40_001)],
            bound_http_addresses: vec![HostPort::loopback(40_002), HostPort::loopback(40_003)],
            node_instance: DaemonIdentity::new("abc", 7),
        }
    }

    fn open(dir: &TempDir) -> Dir {
        Dir::open_ambient_dir(dir.path(), ambient_authority()).expect("open temp dir")
    }

    #[test]
    fn missing_artefact_reads_as_none() {
        let temp = TempDir::new().expect("temp dir");
        assert!(read_status(&open(&temp)).expect("read").is_none());
    }

    #[test]
    fn atomic_write_is_readable() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join(STATUS_FILE_NAME);
        write_status_atomic(&path, &sample()).expect("write");
        let content = read_status(&open(&temp)).expect("read").expect("present");
        let status = parse_status(&content).expect("parse");
        assert_eq!(status.first_rpc(), Some(&HostPort::loopback(40_001)));
        assert_eq!(status.first_http(), Some(&HostPort::loopback(40_002)));
    }

    #[test]
    fn corrupt_content_fails_to_parse() {
        assert!(parse_status("{\"bound_rpc_addresses\": [").is_err());
    }

    #[test]
    fn removing_absent_artefact_succeeds() {
        let temp = TempDir::new().expect("temp dir");
        let dir = open(&temp);
        remove_stale_status(&dir).expect("remove missing");
        std::fs::write(temp.path().join(STATUS_FILE_NAME), b"{}").expect("write");
        remove_stale_status(&dir).expect("remove present");
        assert!(!temp.path().join(STATUS_FILE_NAME).exists());
    }

    #[test]
    fn identity_requires_matching_seqno() {
        let current = DaemonIdentity::new("abc", 2);
        assert!(current.matches(&DaemonIdentity::new("abc", 2)));
        assert!(!current.matches(&DaemonIdentity::new("abc", 1)));
        assert!(!current.matches(&DaemonIdentity::new("abd", 2)));
    }
}
