//! Stub coordinator: records worker registrations and lists them.

use std::io::{self, BufReader};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use minicluster::rpc::{RpcRequest, RpcResponse, WorkerEntry, read_message, write_message};
use minicluster::{HostPort, ServerStatus};
use tracing::{debug, info, warn};

use crate::COORDINATOR_TARGET;
use crate::args::{CoordinatorArgs, Role};
use crate::error::StubError;
use crate::identity::load_identity;
use crate::listener::{self, ConnectionHandler, ListenerHandle};
use crate::publish::publish_status;
use crate::registry::WorkerRegistry;

/// A running stub coordinator.
#[derive(Debug)]
pub struct Coordinator {
    status: ServerStatus,
    registry: Arc<WorkerRegistry>,
    listener: ListenerHandle,
    _http: TcpListener,
}

impl Coordinator {
    /// Binds listeners, starts serving membership, and publishes the status
    /// artefact.
    ///
    /// # Errors
    ///
    /// Returns identity, bind, or artefact failures.
    pub fn start(args: &CoordinatorArgs) -> Result<Self, StubError> {
        let identity = load_identity(&args.base_dir)?;
        let role = args.role();
        let followers = args.followers()?;

        let rpc = listener::bind(&args.rpc_bind_address)?;
        let http = listener::bind(&HostPort::new(
            args.common.webserver_interface.as_str(),
            args.web_port,
        ))?;
        let status = ServerStatus {
            bound_rpc_addresses: vec![listener::local_hostport(&rpc)?],
            bound_http_addresses: vec![listener::local_hostport(&http)?],
            node_instance: identity,
        };

        let registry = Arc::new(WorkerRegistry::default());
        let handler = Arc::new(MembershipHandler {
            registry: Arc::clone(&registry),
            role: role.clone(),
        });
        let serving = listener::serve(rpc, handler)?;
        info!(
            target: COORDINATOR_TARGET,
            ?role,
            followers = followers.len(),
            rpc = ?status.first_rpc(),
            "coordinator serving"
        );
        publish_status(&args.common, &status)?;

        Ok(Self {
            status,
            registry,
            listener: serving,
            _http: http,
        })
    }

    /// Status published at startup.
    #[must_use]
    pub const fn status(&self) -> &ServerStatus {
        &self.status
    }

    /// Registered workers.
    #[must_use]
    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Blocks until the listener stops.
    ///
    /// # Errors
    ///
    /// Returns [`StubError::ThreadPanic`] if the listener panicked.
    pub fn wait(self) -> Result<(), StubError> {
        self.listener.join()
    }

    /// Stops accepting connections and joins the listener.
    ///
    /// # Errors
    ///
    /// Returns [`StubError::ThreadPanic`] if the listener panicked.
    pub fn shutdown(self) -> Result<(), StubError> {
        self.listener.shutdown();
        self.listener.join()
    }
}

struct MembershipHandler {
    registry: Arc<WorkerRegistry>,
    role: Role,
}

impl ConnectionHandler for MembershipHandler {
    fn handle(&self, stream: TcpStream) {
        if let Err(error) = self.serve(stream) {
            warn!(
                target: COORDINATOR_TARGET,
                error = %error,
                "membership connection failed"
            );
        }
    }
}

impl MembershipHandler {
    fn serve(&self, stream: TcpStream) -> io::Result<()> {
        let mut writer = stream.try_clone()?;
        let mut reader = BufReader::new(stream);
        loop {
            let response = match read_message::<_, RpcRequest>(&mut reader) {
                Ok(Some(request)) => self.respond(request),
                Ok(None) => return Ok(()),
                Err(error) if error.kind() == io::ErrorKind::InvalidData => {
                    let reply = RpcResponse::Error {
                        message: format!("malformed request: {error}"),
                    };
                    return write_message(&mut writer, &reply);
                }
                Err(error) => return Err(error),
            };
            write_message(&mut writer, &response)?;
        }
    }

    fn respond(&self, request: RpcRequest) -> RpcResponse {
        match request {
            RpcRequest::RegisterWorker {
                instance,
                rpc_address,
            } => {
                let uuid = instance.permanent_uuid.clone();
                let seqno = instance.instance_seqno;
                let added = self.registry.register(WorkerEntry {
                    instance_id: instance,
                    rpc_address,
                });
                if added {
                    info!(target: COORDINATOR_TARGET, %uuid, seqno, "worker registered");
                } else {
                    debug!(target: COORDINATOR_TARGET, %uuid, seqno, "worker heartbeat");
                }
                RpcResponse::Registered
            }
            RpcRequest::ListWorkers => match &self.role {
                Role::Leader => RpcResponse::Workers {
                    workers: self.registry.snapshot(),
                },
                Role::Follower { leader } => RpcResponse::Error {
                    message: format!("not the leader; leader is {leader}"),
                },
            },
        }
    }
}
