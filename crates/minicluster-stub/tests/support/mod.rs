//! Helpers shared by the end-to-end suites.

use std::net::TcpListener;

use camino::{Utf8Path, Utf8PathBuf};
use minicluster_config::ClusterOptions;
use tempfile::TempDir;

/// Budget for explicit convergence waits in tests.
pub const CONVERGENCE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Directory holding the stub binaries built for this test run.
pub fn bin_dir() -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_BIN_EXE_stub-coordinator"))
        .parent()
        .expect("stub binary has a parent directory")
        .to_owned()
}

/// Reserves `count` loopback ports by binding and releasing them.
pub fn free_ports(count: usize) -> Vec<u16> {
    let listeners: Vec<TcpListener> = (0..count)
        .map(|_| TcpListener::bind("127.0.0.1:0").expect("bind probe listener"))
        .collect();
    listeners
        .iter()
        .map(|listener| listener.local_addr().expect("probe address").port())
        .collect()
}

/// Temporary data root for one cluster.
pub struct StubRoot {
    dir: TempDir,
}

impl StubRoot {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create data root"),
        }
    }

    pub fn path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf()).expect("utf-8 data root")
    }

    /// Options launching the stub binaries with data under this root.
    pub fn options(&self, coordinators: usize, workers: usize) -> ClusterOptions {
        ClusterOptions {
            num_coordinators: coordinators,
            num_workers: workers,
            daemon_bin_path: Some(bin_dir()),
            data_root: Some(self.path()),
            coordinator_binary: "stub-coordinator".to_owned(),
            worker_binary: "stub-worker".to_owned(),
            ..ClusterOptions::default()
        }
    }
}
