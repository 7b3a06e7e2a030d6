//! Lifecycle of a whole cluster.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use minicluster_config::ClusterOptions;
use tracing::{debug, info, warn};

use super::CLUSTER_TARGET;
use super::convergence;
use super::error::ClusterError;
use super::paths::{DATA_DIR_NAME, deduce_bin_root, default_data_root};
use super::topology::{plan_coordinators, worker_dir_name};
use crate::daemon::{Daemon, ExternalCoordinator, ExternalDaemon, ExternalWorker};
use crate::flags::InstanceFlags;
use crate::net::HostPort;
use crate::rpc::{CoordinatorProxy, RpcContext};
use crate::status::DaemonIdentity;

/// Name the shared RPC context reports in logs.
pub const RPC_CONTEXT_NAME: &str = "minicluster-client";

/// Whether the cluster has completed `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClusterState {
    /// Never started, or a start failed part way.
    #[default]
    NotStarted,
    /// Every daemon is up and every worker has registered.
    Started,
    /// Shut down after a start; reported as not started.
    ShutDown,
}

/// Owns every daemon of one test cluster.
///
/// Dropping the controller shuts the cluster down.
#[derive(Debug)]
pub struct ClusterController {
    options: ClusterOptions,
    coordinator_flags: InstanceFlags,
    worker_flags: InstanceFlags,
    coordinators: Vec<ExternalCoordinator>,
    workers: Vec<ExternalWorker>,
    rpc: Option<Arc<RpcContext>>,
    state: ClusterState,
}

impl ClusterController {
    /// Describes a cluster without launching anything.
    #[must_use]
    pub fn new(options: ClusterOptions) -> Self {
        let coordinator_flags = InstanceFlags::parse(&options.extra_coordinator_flags);
        let worker_flags = InstanceFlags::parse(&options.extra_worker_flags);
        Self {
            options,
            coordinator_flags,
            worker_flags,
            coordinators: Vec::new(),
            workers: Vec::new(),
            rpc: None,
            state: ClusterState::NotStarted,
        }
    }

    /// Launches coordinators, then workers, then waits until every worker
    /// has registered with the leader.
    ///
    /// A failed start leaves already-launched daemons tracked so that
    /// [`shutdown`](Self::shutdown) or drop can reap them. Starting again
    /// reaps them first.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::AlreadyStarted`] on a running cluster, a
    /// configuration error before anything is spawned, or the first daemon,
    /// RPC, or registration failure.
    pub fn start(&mut self) -> Result<(), ClusterError> {
        if self.state == ClusterState::Started {
            return Err(ClusterError::AlreadyStarted);
        }
        self.shutdown();
        let topology = self.options.topology()?;
        let bin_root = self.bin_root()?;
        let data_root = self.data_root()?;
        fs::create_dir_all(&data_root).map_err(|source| ClusterError::DataRoot {
            path: data_root.clone(),
            source,
        })?;

        info!(
            target: CLUSTER_TARGET,
            coordinators = self.options.num_coordinators,
            workers = self.options.num_workers,
            bin_root = %bin_root,
            data_root = %data_root,
            "starting cluster"
        );
        self.rpc = Some(Arc::new(RpcContext::new(RPC_CONTEXT_NAME)));

        let exe = bin_root.join(&self.options.coordinator_binary);
        for plan in plan_coordinators(&topology) {
            let mut flags = self.coordinator_flags.resolve(plan.index);
            flags.extend(plan.peer_flags);
            let daemon = ExternalDaemon::new(exe.clone(), data_root.join(&plan.data_dir_name), flags)
                .with_startup_timeout(self.options.startup_timeout());
            let mut coordinator = ExternalCoordinator::with_bind_address(daemon, plan.bind_address);
            let started = coordinator.start();
            self.coordinators.push(coordinator);
            started.map_err(|source| ClusterError::StartCoordinator {
                index: plan.index,
                source,
            })?;
        }

        for _ in 0..self.options.num_workers {
            self.add_worker()?;
        }

        self.wait_for_worker_count(self.options.num_workers, self.options.registration_timeout())?;
        self.state = ClusterState::Started;
        info!(target: CLUSTER_TARGET, "cluster started");
        Ok(())
    }

    /// Kills every daemon and forgets them. Safe to call repeatedly and
    /// after a failed start.
    pub fn shutdown(&mut self) {
        if self.coordinators.is_empty() && self.workers.is_empty() && self.rpc.is_none() {
            return;
        }
        info!(
            target: CLUSTER_TARGET,
            coordinators = self.coordinators.len(),
            workers = self.workers.len(),
            "shutting down cluster"
        );
        for coordinator in &mut self.coordinators {
            coordinator.shutdown();
        }
        for worker in &mut self.workers {
            worker.shutdown();
        }
        self.workers.clear();
        self.coordinators.clear();
        self.rpc = None;
        if self.state == ClusterState::Started {
            self.state = ClusterState::ShutDown;
        }
    }

    /// Launches one more worker pointed at every coordinator.
    ///
    /// The worker gets the next free index, its own data directory, and the
    /// extra worker flags resolved for that index.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NoCoordinators`] before any coordinator is
    /// tracked, or [`ClusterError::StartWorker`] when the launch fails.
    pub fn add_worker(&mut self) -> Result<(), ClusterError> {
        if self.coordinators.is_empty() {
            return Err(ClusterError::NoCoordinators);
        }
        let coordinator_addrs = self.coordinator_hostports()?;
        let index = self.workers.len();
        let exe = self.bin_path(&self.options.worker_binary)?;
        let data_dir = self.data_path(&worker_dir_name(index))?;
        let daemon = ExternalDaemon::new(exe, data_dir, self.worker_flags.resolve(index))
            .with_startup_timeout(self.options.startup_timeout());
        let mut worker = ExternalWorker::new(daemon, &coordinator_addrs);

        debug!(target: CLUSTER_TARGET, index, "adding worker");
        let started = worker.start();
        self.workers.push(worker);
        started.map_err(|source| ClusterError::StartWorker { index, source })
    }

    /// Waits until the leader lists exactly `count` of the currently
    /// running workers.
    ///
    /// Stopped workers have no live identity and never match.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Timeout`] when `timeout` elapses first, or
    /// the leader address or RPC failure.
    pub fn wait_for_worker_count(&self, count: usize, timeout: Duration) -> Result<(), ClusterError> {
        let proxy = self.leader_proxy()?;
        let tracked = self.live_worker_identities();
        convergence::wait_for_worker_count(&proxy, &tracked, count, timeout)
    }

    fn live_worker_identities(&self) -> Vec<DaemonIdentity> {
        self.workers
            .iter()
            .filter_map(|worker| worker.instance_id().ok().cloned())
            .collect()
    }

    fn coordinator_hostports(&self) -> Result<Vec<HostPort>, ClusterError> {
        self.coordinators
            .iter()
            .enumerate()
            .map(|(index, coordinator)| {
                coordinator
                    .bound_rpc_hostport()
                    .map_err(|source| ClusterError::CoordinatorAddress { index, source })
            })
            .collect()
    }

    /// Proxy for the coordinator at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NotStarted`] before a start,
    /// [`ClusterError::UnknownCoordinator`] for an out-of-range index, or
    /// [`ClusterError::CoordinatorAddress`] when the address is unknown.
    pub fn coordinator_proxy(&self, index: usize) -> Result<CoordinatorProxy, ClusterError> {
        let context = self.rpc.clone().ok_or(ClusterError::NotStarted)?;
        let coordinator = self
            .coordinators
            .get(index)
            .ok_or(ClusterError::UnknownCoordinator { index })?;
        let addr = coordinator
            .bound_rpc_addr()
            .map_err(|source| ClusterError::CoordinatorAddress { index, source })?;
        Ok(CoordinatorProxy::new(context, addr))
    }

    /// Proxy for the leader, coordinator 0.
    ///
    /// # Errors
    ///
    /// See [`coordinator_proxy`](Self::coordinator_proxy).
    pub fn leader_proxy(&self) -> Result<CoordinatorProxy, ClusterError> {
        self.coordinator_proxy(0)
    }

    /// Bound RPC address of the leader.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::UnknownCoordinator`] when no coordinator is
    /// tracked, or [`ClusterError::CoordinatorAddress`].
    pub fn leader_rpc_hostport(&self) -> Result<HostPort, ClusterError> {
        let leader = self.leader().ok_or(ClusterError::UnknownCoordinator { index: 0 })?;
        leader
            .bound_rpc_hostport()
            .map_err(|source| ClusterError::CoordinatorAddress { index: 0, source })
    }

    /// Coordinator at `index`.
    #[must_use]
    pub fn coordinator(&self, index: usize) -> Option<&ExternalCoordinator> {
        self.coordinators.get(index)
    }

    /// Coordinator at `index`, mutably.
    #[must_use]
    pub fn coordinator_mut(&mut self, index: usize) -> Option<&mut ExternalCoordinator> {
        self.coordinators.get_mut(index)
    }

    /// The leader coordinator.
    #[must_use]
    pub fn leader(&self) -> Option<&ExternalCoordinator> {
        self.coordinators.first()
    }

    /// Worker at `index`.
    #[must_use]
    pub fn worker(&self, index: usize) -> Option<&ExternalWorker> {
        self.workers.get(index)
    }

    /// Worker at `index`, mutably.
    #[must_use]
    pub fn worker_mut(&mut self, index: usize) -> Option<&mut ExternalWorker> {
        self.workers.get_mut(index)
    }

    /// Tracked coordinators.
    #[must_use]
    pub fn num_coordinators(&self) -> usize {
        self.coordinators.len()
    }

    /// Tracked workers.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Returns `true` between a successful start and the next shutdown.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state == ClusterState::Started
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ClusterState {
        self.state
    }

    /// Options the cluster was built from.
    #[must_use]
    pub const fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Path of the binary `name` inside the binary root.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::BinaryRoot`] when no binary root was
    /// configured and the executable directory cannot be determined.
    pub fn bin_path(&self, name: &str) -> Result<Utf8PathBuf, ClusterError> {
        Ok(self.bin_root()?.join(name))
    }

    /// Path of `name` inside the data root.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::DataRoot`] when no data root was configured
    /// and the temporary directory is not valid UTF-8.
    pub fn data_path(&self, name: &str) -> Result<Utf8PathBuf, ClusterError> {
        Ok(self.data_root()?.join(name))
    }

    fn bin_root(&self) -> Result<Utf8PathBuf, ClusterError> {
        match &self.options.daemon_bin_path {
            Some(path) => Ok(path.clone()),
            None => deduce_bin_root().map_err(|source| ClusterError::BinaryRoot { source }),
        }
    }

    fn data_root(&self) -> Result<Utf8PathBuf, ClusterError> {
        match &self.options.data_root {
            Some(path) => Ok(path.clone()),
            None => default_data_root().map_err(|source| ClusterError::DataRoot {
                path: Utf8PathBuf::from(DATA_DIR_NAME),
                source,
            }),
        }
    }
}

impl Drop for ClusterController {
    fn drop(&mut self) {
        if !self.coordinators.is_empty() || !self.workers.is_empty() {
            warn!(
                target: CLUSTER_TARGET,
                "cluster dropped with live daemons; shutting down"
            );
        }
        self.shutdown();
    }
}
