//! Tests for process spawning and signalling.

use std::fs::File;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use tempfile::TempDir;

use super::ProcessHandle;

fn spawn_shell(script: &str) -> (TempDir, ProcessHandle) {
    let temp = TempDir::new().expect("temp dir");
    let stdout = File::create(temp.path().join("stdout.log")).expect("stdout file");
    let handle = ProcessHandle::spawn(Path::new("/bin/sh"), &["sh", "-c", script], stdout)
        .expect("spawn shell");
    (temp, handle)
}

fn wait_until_exited(handle: &mut ProcessHandle) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if handle.try_wait().expect("try_wait").is_some() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn captures_stdout_to_file() {
    let (temp, mut handle) = spawn_shell("echo captured");
    let status = handle.wait().expect("wait");
    assert!(status.success());
    let output = std::fs::read_to_string(temp.path().join("stdout.log")).expect("read stdout");
    assert_eq!(output.trim(), "captured");
}

#[test]
fn reports_exit_code() {
    let (_temp, mut handle) = spawn_shell("exit 3");
    assert!(wait_until_exited(&mut handle));
    assert_eq!(handle.exit_status().and_then(|status| status.code()), Some(3));
}

#[test]
fn kill_terminates_running_process() {
    let (_temp, mut handle) = spawn_shell("exec sleep 30");
    assert!(handle.try_wait().expect("try_wait").is_none());
    handle.kill().expect("kill");
    let status = handle.wait().expect("wait");
    assert_eq!(status.signal(), Some(Signal::SIGKILL as i32));
}

#[test]
fn signalling_reaped_process_reports_esrch() {
    let (_temp, mut handle) = spawn_shell("true");
    handle.wait().expect("wait");
    assert_eq!(handle.signal(Signal::SIGCONT), Err(Errno::ESRCH));
}

#[test]
fn stop_and_continue_round_trip() {
    let (_temp, mut handle) = spawn_shell("exec sleep 30");
    handle.signal(Signal::SIGSTOP).expect("stop");
    handle.signal(Signal::SIGCONT).expect("continue");
    assert!(handle.try_wait().expect("try_wait").is_none());
    handle.kill().expect("kill");
    handle.wait().expect("wait");
}

#[test]
fn missing_binary_fails_to_spawn() {
    let temp = TempDir::new().expect("temp dir");
    let stdout = File::create(temp.path().join("stdout.log")).expect("stdout file");
    let result = ProcessHandle::spawn(&temp.path().join("absent"), &["absent"], stdout);
    assert!(result.is_err());
}
