use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::warn;

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// One spawned OS process.
///
/// The handle remembers the exit status once reaped so liveness checks stay
/// cheap and signals are never sent to a recycled PID. Dropping a handle that
/// still owns a live child kills and reaps it.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    exit: Option<ExitStatus>,
}

impl ProcessHandle {
    /// Spawns `exe` with `argv`, where `argv[0]` becomes the program name the
    /// child sees and the remaining entries are its arguments.
    ///
    /// Standard output goes to `stdout`; standard error is inherited so
    /// daemon logs interleave with the test output.
    ///
    /// # Errors
    ///
    /// Returns the IO error reported by process creation.
    pub fn spawn<S: AsRef<OsStr>>(exe: &Path, argv: &[S], stdout: File) -> io::Result<Self> {
        let mut command = Command::new(exe);
        if let Some((program, args)) = argv.split_first() {
            command.arg0(program).args(args);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::inherit());
        let child = command.spawn()?;
        Ok(Self { child, exit: None })
    }

    /// OS process id.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Exit status if the process has already been reaped.
    #[must_use]
    pub const fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Non-blocking check for process exit.
    ///
    /// # Errors
    ///
    /// Returns the IO error from `waitpid`.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.exit.is_none() {
            self.exit = self.child.try_wait()?;
        }
        Ok(self.exit)
    }

    /// Sends `signal` to the process.
    ///
    /// # Errors
    ///
    /// Returns `ESRCH` when the process has already been reaped, or the
    /// error reported by `kill(2)`.
    pub fn signal(&self, signal: Signal) -> Result<(), Errno> {
        if self.exit.is_some() {
            return Err(Errno::ESRCH);
        }
        let raw = i32::try_from(self.pid()).map_err(|_| Errno::EINVAL)?;
        kill(Pid::from_raw(raw), signal)
    }

    /// Sends `SIGKILL`.
    ///
    /// # Errors
    ///
    /// As for [`ProcessHandle::signal`].
    pub fn kill(&self) -> Result<(), Errno> {
        self.signal(Signal::SIGKILL)
    }

    /// Blocks until the process has exited and been reaped.
    ///
    /// # Errors
    ///
    /// Returns the IO error from `waitpid`.
    pub fn wait(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }
        let status = self.child.wait()?;
        self.exit = Some(status);
        Ok(status)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.exit.is_some() {
            return;
        }
        let pid = self.pid();
        if let Err(error) = self.kill() {
            warn!(
                target: PROCESS_TARGET,
                pid,
                error = %error,
                "failed to kill process on drop"
            );
        }
        if let Err(error) = self.wait() {
            warn!(
                target: PROCESS_TARGET,
                pid,
                error = %error,
                "failed to reap process on drop"
            );
        }
    }
}
