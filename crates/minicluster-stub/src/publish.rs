//! Publishing the readiness artefact.

use minicluster::flags::STATUS_FORMAT;
use minicluster::{ServerStatus, write_status_atomic};
use tracing::info;

use crate::STUB_TARGET;
use crate::args::CommonArgs;
use crate::error::StubError;

/// Rejects status formats other than JSON.
///
/// # Errors
///
/// Returns [`StubError::UnsupportedFormat`].
pub fn check_format(common: &CommonArgs) -> Result<(), StubError> {
    if common.server_dump_info_format == STATUS_FORMAT {
        Ok(())
    } else {
        Err(StubError::UnsupportedFormat {
            format: common.server_dump_info_format.clone(),
        })
    }
}

/// Writes `status` to the dump path unless the stub was told never to
/// become ready.
///
/// # Errors
///
/// Returns [`StubError::WriteStatus`] when the atomic write fails.
pub fn publish_status(common: &CommonArgs, status: &ServerStatus) -> Result<(), StubError> {
    let path = &common.server_dump_info_path;
    if common.never_ready {
        info!(target: STUB_TARGET, %path, "withholding status artefact");
        return Ok(());
    }
    write_status_atomic(path.as_std_path(), status).map_err(|source| StubError::WriteStatus {
        path: path.clone(),
        source,
    })?;
    info!(
        target: STUB_TARGET,
        %path,
        uuid = %status.node_instance.permanent_uuid,
        seqno = status.node_instance.instance_seqno,
        "published status artefact"
    );
    Ok(())
}
