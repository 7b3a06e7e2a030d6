//! Supervised server daemons.
//!
//! [`ExternalDaemon`] launches one binary, waits for its status artefact, and
//! exposes pause, resume, and shutdown. Coordinators and workers compose it
//! and differ only in the flags they inject and in how a restart rebuilds
//! them; both implement [`Daemon`].

mod coordinator;
mod error;
mod external;
mod readiness;
mod worker;

use std::net::SocketAddr;
use std::time::Duration;

pub use coordinator::ExternalCoordinator;
pub use error::DaemonError;
pub use external::{DaemonState, ExternalDaemon, STDOUT_FILE_NAME};
pub use readiness::READY_POLL_INTERVAL;
pub use worker::ExternalWorker;

use crate::net::HostPort;
use crate::status::DaemonIdentity;

pub(crate) const DAEMON_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::daemon");

/// Default budget for a daemon to write its status artefact.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Operations shared by coordinators and workers.
pub trait Daemon {
    /// Underlying process supervisor.
    fn daemon(&self) -> &ExternalDaemon;

    /// Underlying process supervisor, mutably.
    fn daemon_mut(&mut self) -> &mut ExternalDaemon;

    /// Launches the daemon for the first time.
    ///
    /// # Errors
    ///
    /// Returns the launch or readiness failure.
    fn start(&mut self) -> Result<(), DaemonError>;

    /// Relaunches a stopped daemon on its previous RPC address and HTTP
    /// port.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::IllegalState`] unless a shutdown cached the
    /// bound addresses, or the launch failure.
    fn restart(&mut self) -> Result<(), DaemonError>;

    /// Kills the process. Never fails.
    fn shutdown(&mut self) {
        self.daemon_mut().shutdown();
    }

    /// Suspends the process.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Signal`] when delivery fails.
    fn pause(&mut self) -> Result<(), DaemonError> {
        self.daemon_mut().pause()
    }

    /// Continues a paused process.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Signal`] when delivery fails.
    fn resume(&mut self) -> Result<(), DaemonError> {
        self.daemon_mut().resume()
    }

    /// Bound RPC address.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::NotStarted`] before the first start.
    fn bound_rpc_hostport(&self) -> Result<HostPort, DaemonError> {
        self.daemon().bound_rpc_hostport()
    }

    /// Bound RPC address resolved to a socket address.
    ///
    /// # Errors
    ///
    /// As for [`Daemon::bound_rpc_hostport`], plus resolution failures.
    fn bound_rpc_addr(&self) -> Result<SocketAddr, DaemonError> {
        self.daemon().bound_rpc_addr()
    }

    /// Bound HTTP address.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::NotStarted`] before the first start.
    fn bound_http_hostport(&self) -> Result<HostPort, DaemonError> {
        self.daemon().bound_http_hostport()
    }

    /// Identity of the running incarnation.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::NotStarted`] unless running.
    fn instance_id(&self) -> Result<&DaemonIdentity, DaemonError> {
        self.daemon().instance_id()
    }

    /// Current lifecycle state.
    fn state(&self) -> DaemonState {
        self.daemon().state()
    }
}

#[cfg(test)]
mod tests;
