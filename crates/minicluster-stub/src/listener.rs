//! Background accept loop for stub RPC listeners.

use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use minicluster::HostPort;
use tracing::{info, warn};

use crate::LISTENER_TARGET;
use crate::error::StubError;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
/// Idle connections are dropped after this long without a request.
pub const CONNECTION_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles accepted connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: TcpStream);
}

/// Binds a TCP listener on `address`.
pub(crate) fn bind(address: &HostPort) -> Result<TcpListener, StubError> {
    TcpListener::bind((address.host.as_str(), address.port)).map_err(|source| StubError::Bind {
        address: address.clone(),
        source,
    })
}

/// Bound address of `listener`.
pub(crate) fn local_hostport(listener: &TcpListener) -> Result<HostPort, StubError> {
    listener
        .local_addr()
        .map(HostPort::from)
        .map_err(|source| StubError::LocalAddress { source })
}

/// Handle to the background listener thread.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub(crate) fn join(mut self) -> Result<(), StubError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StubError::ThreadPanic { name: "listener" }),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Serves `listener` on a background thread, one thread per connection.
pub(crate) fn serve(
    listener: TcpListener,
    handler: Arc<dyn ConnectionHandler>,
) -> Result<ListenerHandle, StubError> {
    listener
        .set_nonblocking(true)
        .map_err(|source| StubError::NonBlocking { source })?;
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    let handle = thread::spawn(move || run_accept_loop(&listener, &shutdown_flag, &handler));
    Ok(ListenerHandle {
        shutdown,
        handle: Some(handle),
    })
}

fn run_accept_loop(
    listener: &TcpListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!(target: LISTENER_TARGET, %addr, "rpc listener active");
    }
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let handler = Arc::clone(handler);
                thread::spawn(move || handler.handle(stream));
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}

fn accept_connection(listener: &TcpListener) -> io::Result<Option<TcpStream>> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(Some(CONNECTION_IDLE_TIMEOUT))?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}
