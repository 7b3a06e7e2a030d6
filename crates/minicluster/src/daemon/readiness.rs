//! Polling for the status artefact after a daemon has been spawned.

use std::os::unix::process::ExitStatusExt;
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use cap_std::fs::Dir;
use tracing::{debug, warn};

use super::DAEMON_TARGET;
use super::error::DaemonError;
use crate::process::ProcessHandle;
use crate::status::{ServerStatus, parse_status, read_status};

/// Interval between artefact checks.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Inputs for one readiness wait.
pub(super) struct ReadinessProbe<'a> {
    pub exe: &'a Utf8Path,
    pub status_path: &'a Utf8Path,
    pub timeout: Duration,
}

/// Waits until the artefact appears, the process exits, or the timeout
/// elapses. On timeout the process is killed and reaped before returning.
pub(super) fn wait_for_ready(
    dir: &Dir,
    process: &mut ProcessHandle,
    probe: &ReadinessProbe<'_>,
) -> Result<ServerStatus, DaemonError> {
    let deadline = Instant::now() + probe.timeout;
    loop {
        let content = read_status(dir).map_err(|source| DaemonError::ReadStatus {
            path: probe.status_path.to_owned(),
            source,
        })?;
        if let Some(raw) = content {
            return parse_status(&raw).map_err(|source| DaemonError::CorruptStatusArtifact {
                path: probe.status_path.to_owned(),
                source,
            });
        }
        let exited = process
            .try_wait()
            .map_err(|source| DaemonError::MonitorChild {
                exe: probe.exe.to_owned(),
                source,
            })?;
        if let Some(status) = exited {
            return Err(DaemonError::ProcessExitedEarly {
                exe: probe.exe.to_owned(),
                exit_code: status.code(),
                signal: status.signal(),
            });
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(READY_POLL_INTERVAL);
    }
    abandon(process, probe.exe);
    Err(DaemonError::StartupTimeout {
        exe: probe.exe.to_owned(),
        path: probe.status_path.to_owned(),
        timeout: probe.timeout,
    })
}

fn abandon(process: &mut ProcessHandle, exe: &Utf8Path) {
    let pid = process.pid();
    debug!(
        target: DAEMON_TARGET,
        pid,
        exe = %exe,
        "killing daemon that never reported ready"
    );
    if let Err(error) = process.kill() {
        warn!(target: DAEMON_TARGET, pid, error = %error, "failed to kill daemon");
    }
    if let Err(error) = process.wait() {
        warn!(target: DAEMON_TARGET, pid, error = %error, "failed to reap daemon");
    }
}
