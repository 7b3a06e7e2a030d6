//! Blocking membership client for one coordinator.

use std::io::{self, BufReader, ErrorKind};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::RPC_TARGET;
use super::errors::RpcError;
use super::protocol::{RpcRequest, RpcResponse, WorkerEntry, read_message, write_message};
use crate::net::HostPort;
use crate::status::DaemonIdentity;

/// Default budget for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings shared by every proxy created for one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcContext {
    name: String,
    connect_timeout: Duration,
}

impl RpcContext {
    /// Builds a context identified by `name` in logs.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Overrides the connection budget.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Name used in log events.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connection budget.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

/// Source of the authoritative worker membership view.
pub trait MembershipClient {
    /// Lists every worker the coordinator knows, within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the transport or protocol failure.
    fn list_workers(&self, timeout: Duration) -> Result<Vec<WorkerEntry>, RpcError>;
}

/// Client for one coordinator's membership service.
#[derive(Debug, Clone)]
pub struct CoordinatorProxy {
    context: Arc<RpcContext>,
    addr: SocketAddr,
}

impl CoordinatorProxy {
    /// Builds a proxy for the coordinator at `addr`.
    #[must_use]
    pub const fn new(context: Arc<RpcContext>, addr: SocketAddr) -> Self {
        Self { context, addr }
    }

    /// Coordinator address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Registers a worker incarnation.
    ///
    /// # Errors
    ///
    /// Returns the transport or protocol failure.
    pub fn register_worker(
        &self,
        instance: DaemonIdentity,
        rpc_address: HostPort,
        timeout: Duration,
    ) -> Result<(), RpcError> {
        let request = RpcRequest::RegisterWorker {
            instance,
            rpc_address,
        };
        match self.call(&request, timeout)? {
            RpcResponse::Registered => Ok(()),
            other => Err(self.unexpected(other)),
        }
    }

    /// Sends `request` and waits for the reply. Connect, write, and read
    /// together spend at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::TimedOut`] once the budget is spent, connection
    /// and IO failures, and [`RpcError::Remote`] when the coordinator answers
    /// with an error.
    pub fn call(&self, request: &RpcRequest, timeout: Duration) -> Result<RpcResponse, RpcError> {
        let addr = self.addr;
        let deadline = Instant::now() + timeout;
        let connect_budget = remaining(deadline, addr)?.min(self.context.connect_timeout);
        let stream = TcpStream::connect_timeout(&addr, connect_budget).map_err(|source| {
            if source.kind() == ErrorKind::TimedOut {
                RpcError::TimedOut { addr }
            } else {
                RpcError::Connect { addr, source }
            }
        })?;
        let io_error = |source: io::Error| RpcError::Io { addr, source };

        debug!(
            target: RPC_TARGET,
            messenger = self.context.name(),
            %addr,
            ?request,
            "sending rpc"
        );
        let mut writer = stream.try_clone().map_err(io_error)?;
        writer
            .set_write_timeout(Some(remaining(deadline, addr)?))
            .map_err(io_error)?;
        write_message(&mut writer, request).map_err(|source| classify(addr, source, true))?;

        stream
            .set_read_timeout(Some(remaining(deadline, addr)?))
            .map_err(io_error)?;
        let mut reader = BufReader::new(stream);
        let response: Option<RpcResponse> =
            read_message(&mut reader).map_err(|source| classify(addr, source, false))?;
        match response {
            None => Err(RpcError::Closed { addr }),
            Some(RpcResponse::Error { message }) => Err(RpcError::Remote { addr, message }),
            Some(reply) => Ok(reply),
        }
    }

    fn unexpected(&self, response: RpcResponse) -> RpcError {
        RpcError::UnexpectedResponse {
            addr: self.addr,
            response: format!("{response:?}"),
        }
    }
}

/// Budget left before `deadline`; an exhausted budget is a timeout.
fn remaining(deadline: Instant, addr: SocketAddr) -> Result<Duration, RpcError> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or(RpcError::TimedOut { addr })
}

fn classify(addr: SocketAddr, source: io::Error, writing: bool) -> RpcError {
    match source.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => RpcError::TimedOut { addr },
        ErrorKind::InvalidData if writing => RpcError::Encode { addr, source },
        ErrorKind::InvalidData => RpcError::Decode { addr, source },
        _ => RpcError::Io { addr, source },
    }
}

impl MembershipClient for CoordinatorProxy {
    fn list_workers(&self, timeout: Duration) -> Result<Vec<WorkerEntry>, RpcError> {
        match self.call(&RpcRequest::ListWorkers, timeout)? {
            RpcResponse::Workers { workers } => Ok(workers),
            other => Err(self.unexpected(other)),
        }
    }
}
