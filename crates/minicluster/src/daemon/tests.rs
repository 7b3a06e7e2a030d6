//! Lifecycle tests for daemons backed by fixture scripts.

use std::fs;
use std::time::Instant;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use rstest::{fixture, rstest};

use super::{Daemon, DaemonError, DaemonState, ExternalCoordinator, ExternalWorker};
use crate::net::HostPort;
use crate::status::STATUS_FILE_NAME;
use crate::tests::support::{DataRoot, SHORT_TIMEOUT, daemon};

#[fixture]
fn root() -> DataRoot {
    DataRoot::new()
}

fn coordinator(root: &DataRoot, extra: &[&str]) -> ExternalCoordinator {
    ExternalCoordinator::new(daemon(root, "ready.sh", "coordinator", extra))
}

#[rstest]
fn start_reports_addresses_and_identity(root: DataRoot) {
    let mut coordinator = coordinator(&root, &[]);
    coordinator.start().expect("start");

    let rpc = coordinator.bound_rpc_hostport().expect("rpc address");
    let http = coordinator.bound_http_hostport().expect("http address");
    assert_eq!(rpc.host, "127.0.0.1");
    assert!(!rpc.is_unset());
    assert!(!http.is_unset());
    assert!(coordinator.instance_id().is_ok());
    assert_eq!(coordinator.state(), DaemonState::Running);
    assert!(coordinator.daemon_mut().is_running());
    assert_eq!(
        coordinator.bound_rpc_addr().expect("resolved").port(),
        rpc.port
    );

    coordinator.shutdown();
}

#[rstest]
fn argv_orders_role_extra_and_framework_flags(root: DataRoot) {
    let mut coordinator = coordinator(&root, &["--custom=1"]);
    coordinator.start().expect("start");

    let data_dir = root.join("coordinator");
    let expected = vec![
        "ready.sh".to_owned(),
        format!("--coordinator_base_dir={data_dir}"),
        "--coordinator_rpc_bind_addresses=127.0.0.1:0".to_owned(),
        "--coordinator_web_port=0".to_owned(),
        "--custom=1".to_owned(),
        format!("--server_dump_info_path={data_dir}/{STATUS_FILE_NAME}"),
        "--server_dump_info_format=json".to_owned(),
        "--logtostderr".to_owned(),
        "--logbuflevel=-1".to_owned(),
        "--webserver_interface=localhost".to_owned(),
    ];
    assert_eq!(coordinator.daemon().last_argv(), expected.as_slice());

    let stdout = fs::read_to_string(data_dir.join("stdout.log")).expect("stdout capture");
    assert!(
        stdout.starts_with("started ") && stdout.trim_end().ends_with("ready.sh"),
        "stdout was {stdout:?}"
    );
    coordinator.shutdown();
}

#[rstest]
fn extra_flags_override_role_flags(root: DataRoot) {
    let mut coordinator = coordinator(&root, &["--coordinator_web_port=4321"]);
    coordinator.start().expect("start");
    assert_eq!(
        coordinator.bound_http_hostport().expect("http").port,
        4321
    );
    coordinator.shutdown();
}

#[rstest]
fn second_start_is_rejected(root: DataRoot) {
    let mut coordinator = coordinator(&root, &[]);
    coordinator.start().expect("start");
    assert!(matches!(
        coordinator.start(),
        Err(DaemonError::AlreadyRunning { .. })
    ));
    coordinator.shutdown();
}

#[rstest]
fn accessors_require_a_start(root: DataRoot) {
    let coordinator = coordinator(&root, &[]);
    assert!(matches!(
        coordinator.bound_rpc_hostport(),
        Err(DaemonError::NotStarted { .. })
    ));
    assert!(matches!(
        coordinator.bound_http_hostport(),
        Err(DaemonError::NotStarted { .. })
    ));
    assert!(matches!(
        coordinator.instance_id(),
        Err(DaemonError::NotStarted { .. })
    ));
    assert_eq!(coordinator.state(), DaemonState::NotStarted);
}

#[rstest]
fn restart_requires_prior_shutdown(root: DataRoot) {
    let mut coordinator = coordinator(&root, &[]);
    assert!(matches!(
        coordinator.restart(),
        Err(DaemonError::IllegalState { .. })
    ));

    coordinator.start().expect("start");
    assert!(matches!(
        coordinator.restart(),
        Err(DaemonError::IllegalState { .. })
    ));
    coordinator.shutdown();
}

#[rstest]
fn restart_reuses_rpc_address_and_http_port(root: DataRoot) {
    let mut coordinator = coordinator(&root, &[]);
    coordinator.start().expect("start");
    let rpc = coordinator.bound_rpc_hostport().expect("rpc");
    let http = coordinator.bound_http_hostport().expect("http");
    let first = coordinator.instance_id().expect("identity").clone();

    coordinator.shutdown();
    assert_eq!(coordinator.state(), DaemonState::Stopped);
    assert_eq!(coordinator.bound_rpc_hostport().expect("cached rpc"), rpc);

    coordinator.restart().expect("restart");
    let argv = coordinator.daemon().last_argv();
    assert!(argv.contains(&format!("--coordinator_rpc_bind_addresses={rpc}")));
    assert!(argv.contains(&format!("--coordinator_web_port={}", http.port)));
    assert_eq!(coordinator.bound_rpc_hostport().expect("rpc"), rpc);
    assert_eq!(coordinator.bound_http_hostport().expect("http").port, http.port);

    let second = coordinator.instance_id().expect("identity");
    assert_eq!(second.permanent_uuid, first.permanent_uuid);
    assert!(!second.matches(&first));
    coordinator.shutdown();
}

#[rstest]
fn fixed_bind_address_is_requested(root: DataRoot) {
    let bind = HostPort::loopback(7051);
    let mut coordinator = ExternalCoordinator::with_bind_address(
        daemon(&root, "ready.sh", "coordinator-0", &[]),
        bind.clone(),
    );
    coordinator.start().expect("start");
    assert_eq!(coordinator.bound_rpc_hostport().expect("rpc"), bind);
    coordinator.shutdown();
}

#[rstest]
fn worker_receives_joined_coordinator_list(root: DataRoot) {
    let coordinators = [HostPort::loopback(7051), HostPort::loopback(7052)];
    let mut worker = ExternalWorker::new(daemon(&root, "ready.sh", "worker-0", &[]), &coordinators);
    worker.start().expect("start");

    let argv = worker.daemon().last_argv();
    assert!(argv.contains(&"--worker_coordinator_addrs=127.0.0.1:7051,127.0.0.1:7052".to_owned()));
    assert!(argv.contains(&"--worker_rpc_bind_addresses=127.0.0.1:0".to_owned()));
    assert!(argv.contains(&"--worker_web_port=0".to_owned()));

    let rpc = worker.bound_rpc_hostport().expect("rpc");
    worker.shutdown();
    worker.restart().expect("restart");
    let argv = worker.daemon().last_argv();
    assert!(argv.contains(&format!("--worker_rpc_bind_addresses={rpc}")));
    assert!(argv.contains(&"--worker_coordinator_addrs=127.0.0.1:7051,127.0.0.1:7052".to_owned()));
    worker.shutdown();
}

#[rstest]
#[case(&[], Some(3))]
#[case(&["--fixture_exit_code=7"], Some(7))]
fn early_exit_reports_exit_code(
    root: DataRoot,
    #[case] extra: &[&str],
    #[case] expected: Option<i32>,
) {
    let mut coordinator = ExternalCoordinator::new(daemon(&root, "exit.sh", "coordinator", extra));
    match coordinator.start() {
        Err(DaemonError::ProcessExitedEarly { exit_code, .. }) => assert_eq!(exit_code, expected),
        other => panic!("expected early exit, got {other:?}"),
    }
    assert_eq!(coordinator.state(), DaemonState::NotStarted);
    assert!(coordinator.daemon().pid().is_none());
}

#[rstest]
fn never_ready_times_out_and_kills(root: DataRoot) {
    let pid_file = root.join("never.pid");
    let pid_flag = format!("--fixture_pid_file={pid_file}");
    let mut coordinator = ExternalCoordinator::new(
        daemon(&root, "never_ready.sh", "coordinator", &[pid_flag.as_str()])
            .with_startup_timeout(SHORT_TIMEOUT),
    );

    let started = Instant::now();
    let result = coordinator.start();
    let elapsed = started.elapsed();
    assert!(
        matches!(result, Err(DaemonError::StartupTimeout { .. })),
        "expected timeout, got {result:?}"
    );
    assert!(elapsed >= SHORT_TIMEOUT);
    assert!(elapsed < SHORT_TIMEOUT * 10, "took {elapsed:?}");

    let pid: i32 = fs::read_to_string(&pid_file)
        .expect("pid file")
        .trim()
        .parse()
        .expect("numeric pid");
    assert_eq!(kill(Pid::from_raw(pid), None), Err(Errno::ESRCH));
}

#[rstest]
fn corrupt_artefact_is_fatal(root: DataRoot) {
    let mut coordinator =
        ExternalCoordinator::new(daemon(&root, "corrupt.sh", "coordinator", &[]));
    assert!(matches!(
        coordinator.start(),
        Err(DaemonError::CorruptStatusArtifact { .. })
    ));
}

#[rstest]
fn stale_artefact_is_removed_before_launch(root: DataRoot) {
    let data_dir = root.join("coordinator");
    fs::create_dir_all(&data_dir).expect("data dir");
    fs::write(
        data_dir.join(STATUS_FILE_NAME),
        r#"{"bound_rpc_addresses":[{"host":"127.0.0.1","port":1}],"bound_http_addresses":[],"node_instance":{"permanent_uuid":"stale","instance_seqno":1}}"#,
    )
    .expect("stale artefact");

    let mut coordinator = ExternalCoordinator::new(daemon(&root, "exit.sh", "coordinator", &[]));
    assert!(matches!(
        coordinator.start(),
        Err(DaemonError::ProcessExitedEarly { .. })
    ));
}

#[rstest]
fn pause_and_resume_track_state(root: DataRoot) {
    let mut coordinator = coordinator(&root, &[]);
    coordinator.pause().expect("pause without process");
    coordinator.resume().expect("resume without process");
    assert_eq!(coordinator.state(), DaemonState::NotStarted);

    coordinator.start().expect("start");
    coordinator.pause().expect("pause");
    assert_eq!(coordinator.state(), DaemonState::Paused);
    coordinator.resume().expect("resume");
    assert_eq!(coordinator.state(), DaemonState::Running);
    coordinator.shutdown();
}

#[rstest]
fn paused_daemon_still_shuts_down(root: DataRoot) {
    let mut coordinator = coordinator(&root, &[]);
    coordinator.start().expect("start");
    coordinator.pause().expect("pause");
    coordinator.shutdown();
    assert_eq!(coordinator.state(), DaemonState::Stopped);
    assert!(coordinator.daemon().pid().is_none());
}

#[rstest]
fn shutdown_is_idempotent(root: DataRoot) {
    let mut coordinator = coordinator(&root, &[]);
    coordinator.shutdown();
    assert_eq!(coordinator.state(), DaemonState::NotStarted);

    coordinator.start().expect("start");
    coordinator.shutdown();
    coordinator.shutdown();
    assert_eq!(coordinator.state(), DaemonState::Stopped);
    assert!(!coordinator.daemon_mut().is_running());
}
