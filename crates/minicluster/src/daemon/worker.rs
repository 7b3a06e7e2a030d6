//! Worker daemons.

use super::error::DaemonError;
use super::external::ExternalDaemon;
use super::Daemon;
use crate::flags::{
    WORKER_BASE_DIR, WORKER_COORDINATOR_ADDRS, WORKER_RPC_BIND_ADDRESSES, WORKER_WEB_PORT, flag,
};
use crate::net::{self, HostPort};

/// A worker registered against every coordinator of the cluster.
#[derive(Debug)]
pub struct ExternalWorker {
    daemon: ExternalDaemon,
    coordinator_addrs: String,
}

impl ExternalWorker {
    /// Builds a worker that reports to `coordinators`.
    #[must_use]
    pub fn new(daemon: ExternalDaemon, coordinators: &[HostPort]) -> Self {
        Self {
            daemon,
            coordinator_addrs: net::join(coordinators),
        }
    }

    /// Comma-separated coordinator list passed on every launch.
    #[must_use]
    pub fn coordinator_addrs(&self) -> &str {
        &self.coordinator_addrs
    }

    fn launch(&mut self, rpc: &HostPort, web_port: u16) -> Result<(), DaemonError> {
        let flags = vec![
            flag(WORKER_BASE_DIR, self.daemon.data_dir()),
            flag(WORKER_RPC_BIND_ADDRESSES, rpc),
            flag(WORKER_WEB_PORT, web_port),
            flag(WORKER_COORDINATOR_ADDRS, &self.coordinator_addrs),
        ];
        self.daemon.start_process(flags)
    }
}

impl Daemon for ExternalWorker {
    fn daemon(&self) -> &ExternalDaemon {
        &self.daemon
    }

    fn daemon_mut(&mut self) -> &mut ExternalDaemon {
        &mut self.daemon
    }

    fn start(&mut self) -> Result<(), DaemonError> {
        self.launch(&HostPort::ephemeral(), 0)
    }

    fn restart(&mut self) -> Result<(), DaemonError> {
        let (rpc, web_port) = self.daemon.restart_addresses()?;
        self.launch(&rpc, web_port)
    }
}
