//! Per-coordinator launch plans derived from the validated topology.

use minicluster_config::Topology;

use crate::flags::{FOLLOWER_ADDRESSES, LEADER, LEADER_ADDRESS, flag, switch};
use crate::net::{self, HostPort};

/// Data directory of the only coordinator in a single-node cluster.
pub const SINGLE_COORDINATOR_DIR: &str = "coordinator";

/// How one coordinator is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorPlan {
    /// Position in the coordinator list; 0 is the leader.
    pub index: usize,
    /// Directory name under the data root.
    pub data_dir_name: String,
    /// RPC address requested at first start.
    pub bind_address: HostPort,
    /// Leader and follower wiring flags.
    pub peer_flags: Vec<String>,
}

/// Data directory name of the coordinator at `index` in a distributed
/// cluster.
#[must_use]
pub fn coordinator_dir_name(index: usize) -> String {
    format!("coordinator-{index}")
}

/// Data directory name of the worker at `index`.
#[must_use]
pub fn worker_dir_name(index: usize) -> String {
    format!("worker-{index}")
}

/// Builds the launch plan for every coordinator, leader first.
///
/// The leader is told every follower address. Each follower is told the
/// leader address and every other follower address.
#[must_use]
pub fn plan_coordinators(topology: &Topology) -> Vec<CoordinatorPlan> {
    match topology {
        Topology::Single => vec![CoordinatorPlan {
            index: 0,
            data_dir_name: SINGLE_COORDINATOR_DIR.to_owned(),
            bind_address: HostPort::ephemeral(),
            peer_flags: Vec::new(),
        }],
        Topology::Distributed { rpc_ports } => {
            let addresses: Vec<HostPort> = rpc_ports.iter().copied().map(HostPort::loopback).collect();
            let Some((leader, followers)) = addresses.split_first() else {
                return Vec::new();
            };
            addresses
                .iter()
                .enumerate()
                .map(|(index, address)| {
                    let peer_flags = if index == 0 {
                        vec![switch(LEADER), flag(FOLLOWER_ADDRESSES, net::join(followers))]
                    } else {
                        let others: Vec<HostPort> = followers
                            .iter()
                            .filter(|follower| *follower != address)
                            .cloned()
                            .collect();
                        vec![
                            flag(LEADER_ADDRESS, leader),
                            flag(FOLLOWER_ADDRESSES, net::join(&others)),
                        ]
                    };
                    CoordinatorPlan {
                        index,
                        data_dir_name: coordinator_dir_name(index),
                        bind_address: address.clone(),
                        peer_flags,
                    }
                })
                .collect()
        }
    }
}
