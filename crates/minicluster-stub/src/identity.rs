//! Permanent ids and per-launch sequence numbers.

use std::fs;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use minicluster::DaemonIdentity;
use uuid::Uuid;

use crate::error::StubError;

/// File holding the permanent id inside a data directory.
pub const INSTANCE_ID_FILE: &str = "instance.id";

/// Identity for this launch: the persisted permanent id, generated on first
/// use, and the current time in microseconds as the sequence number.
///
/// # Errors
///
/// Returns [`StubError::Identity`] when the data directory or id file
/// cannot be read or written.
pub fn load_identity(base_dir: &Utf8Path) -> Result<DaemonIdentity, StubError> {
    let identity_error = |source: io::Error| StubError::Identity {
        path: base_dir.to_owned(),
        source,
    };
    fs::create_dir_all(base_dir).map_err(identity_error)?;
    let dir = Dir::open_ambient_dir(base_dir, ambient_authority()).map_err(identity_error)?;
    let uuid = permanent_uuid(&dir).map_err(identity_error)?;
    Ok(DaemonIdentity::new(uuid, launch_seqno()))
}

fn permanent_uuid(dir: &Dir) -> io::Result<String> {
    match dir.read_to_string(INSTANCE_ID_FILE) {
        Ok(existing) if !existing.trim().is_empty() => return Ok(existing.trim().to_owned()),
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(error),
    }
    let generated = Uuid::new_v4().simple().to_string();
    dir.write(INSTANCE_ID_FILE, &generated)?;
    Ok(generated)
}

/// Microseconds since the Unix epoch.
#[must_use]
pub fn launch_seqno() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
        })
}
