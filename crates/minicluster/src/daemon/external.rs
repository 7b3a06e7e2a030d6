//! Supervision of one externally spawned server.

use std::fs::{self, OpenOptions};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use nix::sys::signal::Signal;
use tracing::{debug, info, warn};

use super::error::DaemonError;
use super::readiness::{ReadinessProbe, wait_for_ready};
use super::{DAEMON_TARGET, STARTUP_TIMEOUT};
use crate::flags::framework_flags;
use crate::net::HostPort;
use crate::process::ProcessHandle;
use crate::status::{DaemonIdentity, STATUS_FILE_NAME, ServerStatus, remove_stale_status};

/// File receiving a daemon's standard output.
pub const STDOUT_FILE_NAME: &str = "stdout.log";

/// Lifecycle position of one daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DaemonState {
    /// Never launched.
    #[default]
    NotStarted,
    /// Spawned and waiting for the status artefact.
    Starting,
    /// Reported ready.
    Running,
    /// Suspended with `SIGSTOP`.
    Paused,
    /// Killed by `shutdown`.
    Stopped,
}

/// A server process launched from `exe` with its data under `data_dir`.
///
/// The daemon owns at most one [`ProcessHandle`]. Bound addresses become
/// readable once the process reports ready and are cached on shutdown so a
/// later restart can rebind to the same RPC address and HTTP port.
#[derive(Debug)]
pub struct ExternalDaemon {
    exe: Utf8PathBuf,
    data_dir: Utf8PathBuf,
    extra_flags: Vec<String>,
    startup_timeout: Duration,
    process: Option<ProcessHandle>,
    status: Option<ServerStatus>,
    cached_rpc: Option<HostPort>,
    cached_http: Option<HostPort>,
    state: DaemonState,
    last_argv: Vec<String>,
}

impl ExternalDaemon {
    /// Describes a daemon without launching it.
    ///
    /// `extra_flags` are appended after the role flags of every launch, so
    /// they override them.
    #[must_use]
    pub fn new(
        exe: impl Into<Utf8PathBuf>,
        data_dir: impl Into<Utf8PathBuf>,
        extra_flags: Vec<String>,
    ) -> Self {
        Self {
            exe: exe.into(),
            data_dir: data_dir.into(),
            extra_flags,
            startup_timeout: STARTUP_TIMEOUT,
            process: None,
            status: None,
            cached_rpc: None,
            cached_http: None,
            state: DaemonState::NotStarted,
            last_argv: Vec::new(),
        }
    }

    /// Overrides the readiness budget.
    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Launches the process with `flags` and waits for it to report ready.
    ///
    /// The argument vector is the program name, `flags`, the daemon's extra
    /// flags, and finally the status and logging flags every daemon receives.
    ///
    /// # Errors
    ///
    /// Fails with [`DaemonError::AlreadyRunning`] when a process is tracked,
    /// with a filesystem error when the data directory cannot be prepared,
    /// or with the readiness failure reported by the new process.
    pub fn start_process(&mut self, flags: Vec<String>) -> Result<(), DaemonError> {
        if self.process.is_some() {
            return Err(DaemonError::AlreadyRunning {
                exe: self.exe.clone(),
            });
        }

        let status_path = self.status_path();
        let mut argv = Vec::with_capacity(flags.len() + self.extra_flags.len() + 6);
        argv.push(self.program_name().to_owned());
        argv.extend(flags);
        argv.extend(self.extra_flags.iter().cloned());
        argv.extend(framework_flags(&status_path));
        self.last_argv.clone_from(&argv);

        let dir = self.prepare_data_dir()?;
        let stdout = self.open_stdout()?;

        info!(
            target: DAEMON_TARGET,
            exe = %self.exe,
            argv = ?argv,
            "starting daemon"
        );
        let previous = self.state;
        self.state = DaemonState::Starting;
        let mut process =
            match ProcessHandle::spawn(self.exe.as_std_path(), &argv, stdout) {
                Ok(process) => process,
                Err(source) => {
                    self.state = previous;
                    return Err(DaemonError::StartFailure {
                        exe: self.exe.clone(),
                        source,
                    });
                }
            };

        let probe = ReadinessProbe {
            exe: &self.exe,
            status_path: &status_path,
            timeout: self.startup_timeout,
        };
        match wait_for_ready(&dir, &mut process, &probe) {
            Ok(status) => {
                info!(
                    target: DAEMON_TARGET,
                    exe = %self.exe,
                    pid = process.pid(),
                    rpc = ?status.first_rpc(),
                    http = ?status.first_http(),
                    "daemon ready"
                );
                self.process = Some(process);
                self.status = Some(status);
                self.state = DaemonState::Running;
                Ok(())
            }
            Err(error) => {
                self.state = previous;
                Err(error)
            }
        }
    }

    fn prepare_data_dir(&self) -> Result<Dir, DaemonError> {
        let to_error = |source: io::Error| DaemonError::DataDirectory {
            path: self.data_dir.clone(),
            source,
        };
        fs::create_dir_all(&self.data_dir).map_err(to_error)?;
        let dir = Dir::open_ambient_dir(&self.data_dir, ambient_authority()).map_err(to_error)?;
        remove_stale_status(&dir).map_err(|source| DaemonError::RemoveStaleStatus {
            path: self.data_dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    fn open_stdout(&self) -> Result<fs::File, DaemonError> {
        let path = self.data_dir.join(STDOUT_FILE_NAME);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| DaemonError::StdoutCapture { path, source })
    }

    /// Suspends the process with `SIGSTOP`. Does nothing without a process.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Signal`] when delivery fails.
    pub fn pause(&mut self) -> Result<(), DaemonError> {
        self.send(Signal::SIGSTOP)?;
        if self.process.is_some() {
            self.state = DaemonState::Paused;
        }
        Ok(())
    }

    /// Continues a paused process with `SIGCONT`. Does nothing without a
    /// process.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Signal`] when delivery fails.
    pub fn resume(&mut self) -> Result<(), DaemonError> {
        self.send(Signal::SIGCONT)?;
        if self.process.is_some() {
            self.state = DaemonState::Running;
        }
        Ok(())
    }

    fn send(&self, signal: Signal) -> Result<(), DaemonError> {
        let Some(process) = self.process.as_ref() else {
            return Ok(());
        };
        let pid = process.pid();
        debug!(target: DAEMON_TARGET, pid, %signal, exe = %self.exe, "signalling daemon");
        process
            .signal(signal)
            .map_err(|source| DaemonError::Signal {
                pid,
                signal,
                source,
            })
    }

    /// Kills the process and waits for it to be reaped.
    ///
    /// Bound addresses are cached first. Failures are logged, never
    /// returned. Does nothing without a process.
    pub fn shutdown(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };
        if let Some(status) = self.status.take() {
            self.cached_rpc = status.first_rpc().cloned();
            self.cached_http = status.first_http().cloned();
        }
        let pid = process.pid();
        info!(target: DAEMON_TARGET, pid, exe = %self.exe, "stopping daemon");
        if let Err(error) = process.kill() {
            warn!(
                target: DAEMON_TARGET,
                pid,
                error = %error,
                "failed to kill daemon"
            );
        }
        if let Err(error) = process.wait() {
            warn!(
                target: DAEMON_TARGET,
                pid,
                error = %error,
                "failed to reap daemon"
            );
        }
        self.state = DaemonState::Stopped;
    }

    /// Addresses to rebind to on restart: the cached RPC address and HTTP
    /// port recorded by the last shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::IllegalState`] while a process is tracked or
    /// before any shutdown cached a non-zero RPC port.
    pub fn restart_addresses(&self) -> Result<(HostPort, u16), DaemonError> {
        if self.process.is_some() {
            return Err(DaemonError::IllegalState {
                exe: self.exe.clone(),
                reason: "cannot restart a daemon that is still running",
            });
        }
        match self.cached_rpc.as_ref() {
            Some(rpc) if !rpc.is_unset() => {
                let http_port = self.cached_http.as_ref().map_or(0, |http| http.port);
                Ok((rpc.clone(), http_port))
            }
            _ => Err(DaemonError::IllegalState {
                exe: self.exe.clone(),
                reason: "restart requires a previous start and shutdown",
            }),
        }
    }

    /// Bound RPC address of the running process, or the cached one after a
    /// shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::NotStarted`] before the first successful start.
    pub fn bound_rpc_hostport(&self) -> Result<HostPort, DaemonError> {
        self.bound_address("rpc", ServerStatus::first_rpc, self.cached_rpc.as_ref())
    }

    /// Bound HTTP address of the running process, or the cached one after a
    /// shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::NotStarted`] before the first successful start.
    pub fn bound_http_hostport(&self) -> Result<HostPort, DaemonError> {
        self.bound_address("http", ServerStatus::first_http, self.cached_http.as_ref())
    }

    fn bound_address(
        &self,
        kind: &'static str,
        first: fn(&ServerStatus) -> Option<&HostPort>,
        cached: Option<&HostPort>,
    ) -> Result<HostPort, DaemonError> {
        if let Some(status) = self.status.as_ref() {
            return first(status)
                .cloned()
                .ok_or_else(|| DaemonError::MissingBoundAddress {
                    exe: self.exe.clone(),
                    kind,
                });
        }
        cached.cloned().ok_or_else(|| DaemonError::NotStarted {
            exe: self.exe.clone(),
        })
    }

    /// Resolves the bound RPC address to a socket address.
    ///
    /// # Errors
    ///
    /// Fails as [`ExternalDaemon::bound_rpc_hostport`] does, or with
    /// [`DaemonError::AddressResolution`].
    pub fn bound_rpc_addr(&self) -> Result<SocketAddr, DaemonError> {
        let hostport = self.bound_rpc_hostport()?;
        hostport
            .resolve()
            .map_err(|source| DaemonError::AddressResolution {
                address: hostport.to_string(),
                source,
            })
    }

    /// Identity reported by the running incarnation.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::NotStarted`] unless a process is running.
    pub fn instance_id(&self) -> Result<&DaemonIdentity, DaemonError> {
        self.status
            .as_ref()
            .map(|status| &status.node_instance)
            .ok_or_else(|| DaemonError::NotStarted {
                exe: self.exe.clone(),
            })
    }

    /// Last status artefact read, while a process is tracked.
    #[must_use]
    pub const fn status(&self) -> Option<&ServerStatus> {
        self.status.as_ref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DaemonState {
        self.state
    }

    /// PID of the tracked process.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(ProcessHandle::pid)
    }

    /// Returns `true` while a tracked process has not exited.
    pub fn is_running(&mut self) -> bool {
        self.process
            .as_mut()
            .is_some_and(|process| matches!(process.try_wait(), Ok(None)))
    }

    /// Daemon binary.
    #[must_use]
    pub fn exe(&self) -> &Utf8Path {
        &self.exe
    }

    /// Data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    /// Path of the status artefact.
    #[must_use]
    pub fn status_path(&self) -> Utf8PathBuf {
        self.data_dir.join(STATUS_FILE_NAME)
    }

    /// Extra flags appended to every launch.
    #[must_use]
    pub fn extra_flags(&self) -> &[String] {
        &self.extra_flags
    }

    /// Argument vector of the most recent launch attempt.
    #[must_use]
    pub fn last_argv(&self) -> &[String] {
        &self.last_argv
    }

    fn program_name(&self) -> &str {
        self.exe
            .file_name()
            .unwrap_or_else(|| self.exe.as_str())
    }
}
