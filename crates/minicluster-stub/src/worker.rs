//! Stub worker: heartbeats its identity to every coordinator.

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use minicluster::rpc::{
    CoordinatorProxy, RpcContext, RpcRequest, RpcResponse, read_message, write_message,
};
use minicluster::{DaemonIdentity, HostPort, ServerStatus};
use tracing::{debug, info, warn};

use crate::WORKER_TARGET;
use crate::args::WorkerArgs;
use crate::error::StubError;
use crate::identity::load_identity;
use crate::listener::{self, ConnectionHandler, ListenerHandle};
use crate::publish::publish_status;

/// Pause between registration rounds.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);
/// Budget for a single registration call.
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(1);

/// A running stub worker.
#[derive(Debug)]
pub struct Worker {
    status: ServerStatus,
    listener: ListenerHandle,
    stop: Arc<AtomicBool>,
    heartbeat: Option<thread::JoinHandle<()>>,
    _http: TcpListener,
}

impl Worker {
    /// Binds listeners, publishes the status artefact, and starts
    /// heartbeating.
    ///
    /// # Errors
    ///
    /// Returns address, identity, bind, or artefact failures.
    pub fn start(args: &WorkerArgs) -> Result<Self, StubError> {
        let coordinators = resolve_all(&args.coordinators()?)?;
        let identity = load_identity(&args.base_dir)?;

        let rpc = listener::bind(&args.rpc_bind_address)?;
        let http = listener::bind(&HostPort::new(
            args.common.webserver_interface.as_str(),
            args.web_port,
        ))?;
        let rpc_address = listener::local_hostport(&rpc)?;
        let status = ServerStatus {
            bound_rpc_addresses: vec![rpc_address.clone()],
            bound_http_addresses: vec![listener::local_hostport(&http)?],
            node_instance: identity.clone(),
        };
        let serving = listener::serve(rpc, Arc::new(RefusingHandler))?;
        publish_status(&args.common, &status)?;

        let context = Arc::new(RpcContext::new("stub-worker"));
        let proxies: Vec<CoordinatorProxy> = coordinators
            .into_iter()
            .map(|addr| CoordinatorProxy::new(Arc::clone(&context), addr))
            .collect();
        info!(
            target: WORKER_TARGET,
            coordinators = proxies.len(),
            rpc = %rpc_address,
            "worker heartbeating"
        );
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let heartbeat = thread::spawn(move || {
            heartbeat_loop(&proxies, &identity, &rpc_address, &stop_flag);
        });

        Ok(Self {
            status,
            listener: serving,
            stop,
            heartbeat: Some(heartbeat),
            _http: http,
        })
    }

    /// Status published at startup.
    #[must_use]
    pub const fn status(&self) -> &ServerStatus {
        &self.status
    }

    /// Blocks until heartbeating stops.
    ///
    /// # Errors
    ///
    /// Returns [`StubError::ThreadPanic`] if the heartbeat thread panicked.
    pub fn wait(mut self) -> Result<(), StubError> {
        self.join_heartbeat()
    }

    /// Stops heartbeating and the listener.
    ///
    /// # Errors
    ///
    /// Returns [`StubError::ThreadPanic`] if a background thread panicked.
    pub fn shutdown(mut self) -> Result<(), StubError> {
        self.stop.store(true, Ordering::SeqCst);
        self.join_heartbeat()?;
        self.listener.shutdown();
        Ok(())
    }

    fn join_heartbeat(&mut self) -> Result<(), StubError> {
        match self.heartbeat.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StubError::ThreadPanic { name: "heartbeat" }),
            None => Ok(()),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn resolve_all(addresses: &[HostPort]) -> Result<Vec<SocketAddr>, StubError> {
    addresses
        .iter()
        .map(|address| {
            address.resolve().map_err(|source| StubError::Resolve {
                address: address.clone(),
                source,
            })
        })
        .collect()
}

fn heartbeat_loop(
    proxies: &[CoordinatorProxy],
    identity: &DaemonIdentity,
    rpc_address: &HostPort,
    stop: &AtomicBool,
) {
    let mut failing = vec![false; proxies.len()];
    while !stop.load(Ordering::SeqCst) {
        for (proxy, failed) in proxies.iter().zip(failing.iter_mut()) {
            match proxy.register_worker(identity.clone(), rpc_address.clone(), HEARTBEAT_TIMEOUT) {
                Ok(()) => {
                    if *failed {
                        info!(target: WORKER_TARGET, addr = %proxy.addr(), "registration recovered");
                    }
                    *failed = false;
                }
                Err(error) => {
                    if !*failed {
                        warn!(
                            target: WORKER_TARGET,
                            addr = %proxy.addr(),
                            error = %error,
                            "registration failed"
                        );
                    }
                    *failed = true;
                }
            }
        }
        debug!(target: WORKER_TARGET, "heartbeat round complete");
        thread::sleep(HEARTBEAT_INTERVAL);
    }
}

struct RefusingHandler;

impl ConnectionHandler for RefusingHandler {
    fn handle(&self, stream: TcpStream) {
        let Ok(mut writer) = stream.try_clone() else {
            return;
        };
        let mut reader = BufReader::new(stream);
        if let Err(error) = read_message::<_, RpcRequest>(&mut reader) {
            debug!(target: WORKER_TARGET, error = %error, "unreadable request");
        }
        let reply = RpcResponse::Error {
            message: "workers do not serve membership requests".to_owned(),
        };
        if let Err(error) = write_message(&mut writer, &reply) {
            debug!(target: WORKER_TARGET, error = %error, "failed to refuse request");
        }
    }
}
