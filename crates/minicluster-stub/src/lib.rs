//! Stand-in coordinator and worker servers for end-to-end tests.
//!
//! The stubs honour the flag contract the engine launches daemons with: they
//! bind RPC and HTTP listeners, publish a JSON status artefact atomically,
//! and speak the line-delimited membership protocol from
//! [`minicluster::rpc`]. Coordinators record worker registrations; workers
//! heartbeat their identity to every coordinator.
//!
//! Knobs for failure scenarios:
//!
//! - `--stub_exit_code=<n>` exits with `n` before publishing anything.
//! - `--stub_never_ready` binds listeners but never publishes the artefact.
//! - `--stub_tag=<text>` echoes `tag=<text>` to stdout at startup.

mod args;
mod coordinator;
mod error;
mod identity;
mod listener;
mod publish;
mod registry;
mod worker;

use std::io::{self, Write};
use std::process::ExitCode;

use minicluster::telemetry;
use minicluster_config::LogFormat;
use tracing::info;

pub use args::{CommonArgs, CoordinatorArgs, Role, WorkerArgs, parse_address_list};
pub use coordinator::Coordinator;
pub use error::StubError;
pub use identity::{INSTANCE_ID_FILE, launch_seqno, load_identity};
pub use listener::CONNECTION_IDLE_TIMEOUT;
pub use publish::{check_format, publish_status};
pub use registry::WorkerRegistry;
pub use worker::{HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT, Worker};

pub(crate) const STUB_TARGET: &str = env!("CARGO_PKG_NAME");
pub(crate) const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::listener");
pub(crate) const COORDINATOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::coordinator");
pub(crate) const WORKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::worker");

/// Runs a coordinator until it is killed.
///
/// # Errors
///
/// Returns setup failures; a requested `--stub_exit_code` is an `Ok` exit
/// code instead.
pub fn run_coordinator(args: &CoordinatorArgs) -> Result<ExitCode, StubError> {
    if let Some(code) = prepare(&args.common, "coordinator")? {
        return Ok(code);
    }
    Coordinator::start(args)?.wait()?;
    Ok(ExitCode::SUCCESS)
}

/// Runs a worker until it is killed.
///
/// # Errors
///
/// Returns setup failures; a requested `--stub_exit_code` is an `Ok` exit
/// code instead.
pub fn run_worker(args: &WorkerArgs) -> Result<ExitCode, StubError> {
    if let Some(code) = prepare(&args.common, "worker")? {
        return Ok(code);
    }
    Worker::start(args)?.wait()?;
    Ok(ExitCode::SUCCESS)
}

/// Writes a fatal error to stderr for the binaries.
#[must_use]
pub fn report_failure(program: &str, error: &StubError) -> ExitCode {
    // Nothing is left to report to if stderr is gone.
    drop(writeln!(io::stderr().lock(), "{program}: {error}"));
    ExitCode::FAILURE
}

fn prepare(common: &CommonArgs, role: &str) -> Result<Option<ExitCode>, StubError> {
    telemetry::initialise(&common.log_filter, LogFormat::Compact)?;
    check_format(common)?;
    if let Some(tag) = &common.tag {
        let mut stdout = io::stdout().lock();
        if writeln!(stdout, "tag={tag}").and_then(|()| stdout.flush()).is_err() {
            info!(target: STUB_TARGET, "stdout closed; tag not echoed");
        }
    }
    if let Some(code) = common.exit_code {
        info!(target: STUB_TARGET, role, code, "exiting on request");
        return Ok(Some(ExitCode::from(code)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests;
