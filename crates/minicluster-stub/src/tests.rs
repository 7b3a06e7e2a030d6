//! In-process tests for argument parsing and the coordinator service.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use minicluster::rpc::{CoordinatorProxy, MembershipClient, RpcContext, RpcError};
use minicluster::{DaemonIdentity, HostPort, STATUS_FILE_NAME, ServerStatus};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

const CALL_TIMEOUT: Duration = Duration::from_secs(2);

struct Scratch {
    dir: TempDir,
}

impl Scratch {
    fn path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf()).expect("utf-8 temp path")
    }

    fn coordinator_args(&self, extra: &[&str]) -> CoordinatorArgs {
        let base = self.path().join("coordinator");
        let mut argv = vec![
            "stub-coordinator".to_owned(),
            format!("--coordinator_base_dir={base}"),
            format!("--server_dump_info_path={base}/{STATUS_FILE_NAME}"),
        ];
        argv.extend(extra.iter().map(|flag| (*flag).to_owned()));
        CoordinatorArgs::try_parse_from(argv).expect("coordinator args")
    }
}

#[fixture]
fn scratch() -> Scratch {
    Scratch {
        dir: TempDir::new().expect("temp dir"),
    }
}

fn proxy(coordinator: &Coordinator) -> CoordinatorProxy {
    let addr = coordinator
        .status()
        .first_rpc()
        .expect("rpc address")
        .resolve()
        .expect("resolve");
    CoordinatorProxy::new(Arc::new(RpcContext::new("stub-tests")), addr)
}

#[test]
fn repeated_flags_keep_the_last_value() {
    let args = WorkerArgs::try_parse_from([
        "stub-worker",
        "--worker_base_dir=/data/w",
        "--worker_web_port=0",
        "--worker_coordinator_addrs=127.0.0.1:7051,127.0.0.1:7052",
        "--server_dump_info_path=/data/w/info.json",
        "--logtostderr",
        "--logbuflevel=-1",
        "--worker_web_port=4321",
    ])
    .expect("worker args");
    assert_eq!(args.web_port, 4321);
    assert_eq!(args.common.log_buf_level, -1);
    assert_eq!(
        args.coordinators().expect("addresses"),
        vec![HostPort::loopback(7051), HostPort::loopback(7052)]
    );
}

#[rstest]
#[case("", vec![])]
#[case("127.0.0.1:7052", vec![HostPort::loopback(7052)])]
#[case(" 127.0.0.1:7052 ,,127.0.0.1:7053", vec![HostPort::loopback(7052), HostPort::loopback(7053)])]
fn address_lists_skip_empty_entries(#[case] raw: &str, #[case] expected: Vec<HostPort>) {
    assert_eq!(parse_address_list(raw).expect("valid list"), expected);
}

#[test]
fn malformed_address_list_is_rejected() {
    assert!(parse_address_list("127.0.0.1:7051,nonsense").is_err());
}

#[rstest]
fn coordinator_roles_follow_topology_flags(scratch: Scratch) {
    assert_eq!(scratch.coordinator_args(&[]).role(), Role::Leader);
    assert_eq!(
        scratch
            .coordinator_args(&["--leader", "--follower_addresses=127.0.0.1:7052"])
            .role(),
        Role::Leader
    );
    assert_eq!(
        scratch
            .coordinator_args(&["--leader_address=127.0.0.1:7051", "--follower_addresses="])
            .role(),
        Role::Follower {
            leader: HostPort::loopback(7051)
        }
    );
}

#[rstest]
fn coordinator_publishes_status_and_lists_registrations(scratch: Scratch) {
    let args = scratch.coordinator_args(&[]);
    let coordinator = Coordinator::start(&args).expect("coordinator");

    let content = std::fs::read_to_string(&args.common.server_dump_info_path).expect("artefact");
    let published: ServerStatus = serde_json::from_str(&content).expect("valid artefact");
    assert_eq!(&published, coordinator.status());
    assert_ne!(published.first_rpc().expect("rpc").port, 0);
    assert_ne!(published.first_http().expect("http").port, 0);

    let client = proxy(&coordinator);
    assert!(client.list_workers(CALL_TIMEOUT).expect("empty listing").is_empty());
    client
        .register_worker(DaemonIdentity::new("w", 1), HostPort::loopback(1), CALL_TIMEOUT)
        .expect("register");
    client
        .register_worker(DaemonIdentity::new("w", 2), HostPort::loopback(2), CALL_TIMEOUT)
        .expect("re-register");

    let listed = client.list_workers(CALL_TIMEOUT).expect("listing");
    assert_eq!(listed.len(), 1);
    assert!(listed.iter().all(|entry| entry.instance_id == DaemonIdentity::new("w", 2)));
    assert_eq!(coordinator.registry().len(), 1);
    coordinator.shutdown().expect("shutdown");
}

#[rstest]
fn follower_refuses_listings(scratch: Scratch) {
    let args = scratch.coordinator_args(&["--leader_address=127.0.0.1:7051"]);
    let coordinator = Coordinator::start(&args).expect("coordinator");
    let client = proxy(&coordinator);
    match client.list_workers(CALL_TIMEOUT) {
        Err(RpcError::Remote { message, .. }) => assert!(message.contains("not the leader")),
        other => panic!("expected a refusal, got {other:?}"),
    }
    coordinator.shutdown().expect("shutdown");
}

#[rstest]
fn never_ready_withholds_the_artefact(scratch: Scratch) {
    let args = scratch.coordinator_args(&["--stub_never_ready"]);
    let coordinator = Coordinator::start(&args).expect("coordinator");
    assert!(!args.common.server_dump_info_path.exists());
    coordinator.shutdown().expect("shutdown");
}

#[rstest]
fn non_json_format_is_rejected(scratch: Scratch) {
    let args = scratch.coordinator_args(&["--server_dump_info_format=pb"]);
    assert!(matches!(
        check_format(&args.common),
        Err(StubError::UnsupportedFormat { .. })
    ));
}
