//! Coordinator daemons.

use super::error::DaemonError;
use super::external::ExternalDaemon;
use super::Daemon;
use crate::flags::{
    COORDINATOR_BASE_DIR, COORDINATOR_RPC_BIND_ADDRESSES, COORDINATOR_WEB_PORT, flag,
};
use crate::net::HostPort;

/// A coordinator, either standalone on an ephemeral port or one member of a
/// distributed topology at a fixed address.
#[derive(Debug)]
pub struct ExternalCoordinator {
    daemon: ExternalDaemon,
    rpc_bind_address: HostPort,
}

impl ExternalCoordinator {
    /// Standalone coordinator bound to `127.0.0.1:0`.
    #[must_use]
    pub fn new(daemon: ExternalDaemon) -> Self {
        Self::with_bind_address(daemon, HostPort::ephemeral())
    }

    /// Coordinator bound to a fixed address that peers already know.
    #[must_use]
    pub const fn with_bind_address(daemon: ExternalDaemon, rpc_bind_address: HostPort) -> Self {
        Self {
            daemon,
            rpc_bind_address,
        }
    }

    /// Address requested at the first start.
    #[must_use]
    pub const fn rpc_bind_address(&self) -> &HostPort {
        &self.rpc_bind_address
    }

    fn launch(&mut self, rpc: &HostPort, web_port: u16) -> Result<(), DaemonError> {
        let flags = vec![
            flag(COORDINATOR_BASE_DIR, self.daemon.data_dir()),
            flag(COORDINATOR_RPC_BIND_ADDRESSES, rpc),
            flag(COORDINATOR_WEB_PORT, web_port),
        ];
        self.daemon.start_process(flags)
    }
}

impl Daemon for ExternalCoordinator {
    fn daemon(&self) -> &ExternalDaemon {
        &self.daemon
    }

    fn daemon_mut(&mut self) -> &mut ExternalDaemon {
        &mut self.daemon
    }

    fn start(&mut self) -> Result<(), DaemonError> {
        let rpc = self.rpc_bind_address.clone();
        self.launch(&rpc, 0)
    }

    fn restart(&mut self) -> Result<(), DaemonError> {
        let (rpc, web_port) = self.daemon.restart_addresses()?;
        self.launch(&rpc, web_port)
    }
}
