//! Cluster orchestration.
//!
//! [`ClusterController`] turns [`ClusterOptions`](minicluster_config::ClusterOptions)
//! into running coordinators and workers, and waits for the leader to list
//! every worker before reporting the cluster as started.

mod controller;
mod convergence;
mod error;
mod paths;
mod topology;

pub use controller::{ClusterController, ClusterState, RPC_CONTEXT_NAME};
pub use convergence::{REGISTRATION_POLL_INTERVAL, count_matching, wait_for_worker_count};
pub use error::ClusterError;
pub use paths::DATA_DIR_NAME;
pub use topology::{
    CoordinatorPlan, SINGLE_COORDINATOR_DIR, coordinator_dir_name, plan_coordinators,
    worker_dir_name,
};

pub(crate) const CLUSTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::cluster");
