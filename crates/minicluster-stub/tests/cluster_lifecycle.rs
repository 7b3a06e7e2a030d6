//! Behavioural coverage for whole-cluster lifecycles.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clarity and assertions"
)]

mod support;

use minicluster::rpc::MembershipClient;
use minicluster::{ClusterController, ClusterError};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use support::{CONVERGENCE_TIMEOUT, StubRoot, free_ports};

struct World {
    root: StubRoot,
    cluster: Option<ClusterController>,
    requested_ports: Vec<u16>,
    outcome: Option<Result<(), ClusterError>>,
}

#[fixture]
fn world() -> World {
    World {
        root: StubRoot::new(),
        cluster: None,
        requested_ports: Vec::new(),
        outcome: None,
    }
}

fn cluster(world: &mut World) -> &mut ClusterController {
    world
        .cluster
        .as_mut()
        .expect("cluster should be configured")
}

#[given("a single-coordinator cluster with {workers} workers")]
fn given_single(world: &mut World, workers: usize) {
    world.cluster = Some(ClusterController::new(world.root.options(1, workers)));
}

#[given("a distributed cluster with {coordinators} coordinators on free ports and {workers} workers")]
fn given_distributed(world: &mut World, coordinators: usize, workers: usize) {
    world.requested_ports = free_ports(coordinators);
    let mut options = world.root.options(coordinators, workers);
    options.coordinator_rpc_ports.clone_from(&world.requested_ports);
    world.cluster = Some(ClusterController::new(options));
}

#[given("a distributed cluster with {coordinators} coordinators and {ports} requested ports")]
fn given_mismatched(world: &mut World, coordinators: usize, ports: usize) {
    let mut options = world.root.options(coordinators, 1);
    options.coordinator_rpc_ports = free_ports(ports);
    world.cluster = Some(ClusterController::new(options));
}

#[when("the cluster starts")]
fn when_starts(world: &mut World) {
    world.outcome = Some(cluster(world).start());
}

#[when("the cluster shuts down")]
fn when_shuts_down(world: &mut World) {
    cluster(world).shutdown();
}

#[then("the cluster is started")]
fn then_started(world: &mut World) {
    let outcome = world.outcome.as_ref().expect("a start should have run");
    assert!(outcome.is_ok(), "start failed: {outcome:?}");
    assert!(cluster(world).is_started());
}

#[then("the cluster is not started")]
fn then_not_started(world: &mut World) {
    let controller = cluster(world);
    assert!(!controller.is_started());
    assert_eq!(controller.num_coordinators(), 0);
    assert_eq!(controller.num_workers(), 0);
}

#[then("the leader lists {count} workers")]
fn then_leader_lists(world: &mut World, count: usize) {
    let listed = cluster(world)
        .leader_proxy()
        .expect("leader proxy")
        .list_workers(CONVERGENCE_TIMEOUT)
        .expect("listing");
    assert_eq!(listed.len(), count);
}

#[then("the leader is bound to the first requested port")]
fn then_leader_port(world: &mut World) {
    let expected = world.requested_ports.first().copied().expect("requested port");
    let leader = cluster(world).leader_rpc_hostport().expect("leader address");
    assert_eq!(leader.port, expected);
}

#[then("the start fails with a configuration error")]
fn then_configuration_error(world: &mut World) {
    let outcome = world.outcome.as_ref().expect("a start should have run");
    assert!(
        matches!(outcome, Err(ClusterError::Configuration(_))),
        "got {outcome:?}"
    );
}

#[then("no coordinator was spawned")]
fn then_nothing_spawned(world: &mut World) {
    assert_eq!(cluster(world).num_coordinators(), 0);
    assert!(!world.root.path().join("coordinator-0").exists());
}

#[scenario(path = "tests/features/cluster_lifecycle.feature")]
fn cluster_lifecycle_behaviour(world: World) {
    drop(world);
}
