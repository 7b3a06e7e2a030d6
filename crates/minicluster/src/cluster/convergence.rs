//! Waiting for the coordinator to list every tracked worker.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::CLUSTER_TARGET;
use super::error::ClusterError;
use crate::rpc::{MembershipClient, RpcError, WorkerEntry};
use crate::status::DaemonIdentity;

/// Pause between membership listings.
pub const REGISTRATION_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Number of listed workers whose identity equals a tracked identity.
///
/// Entries left behind by a previous incarnation share the permanent id
/// but carry an older sequence number, so they do not count.
#[must_use]
pub fn count_matching(listed: &[WorkerEntry], tracked: &[DaemonIdentity]) -> usize {
    listed
        .iter()
        .filter(|entry| tracked.iter().any(|id| id.matches(&entry.instance_id)))
        .count()
}

/// Polls `client` until exactly `expected` listed workers match `tracked`.
///
/// Each call receives the remaining budget as its timeout. A call that runs
/// out of that budget ends the wait as a timeout; any other RPC failure ends
/// it immediately.
///
/// # Errors
///
/// Returns [`ClusterError::Timeout`] once the budget is spent and
/// [`ClusterError::Rpc`] for the first failed call.
pub fn wait_for_worker_count<C>(
    client: &C,
    tracked: &[DaemonIdentity],
    expected: usize,
    timeout: Duration,
) -> Result<(), ClusterError>
where
    C: MembershipClient + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut matched = 0;
    loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero());
        let Some(budget) = remaining else {
            return Err(ClusterError::Timeout {
                expected,
                matched,
                timeout,
            });
        };
        let listed = match client.list_workers(budget) {
            Ok(listed) => listed,
            Err(RpcError::TimedOut { .. }) => {
                return Err(ClusterError::Timeout {
                    expected,
                    matched,
                    timeout,
                });
            }
            Err(source) => return Err(ClusterError::Rpc { source }),
        };
        matched = count_matching(&listed, tracked);
        if matched == expected {
            debug!(
                target: CLUSTER_TARGET,
                expected,
                "all workers registered"
            );
            return Ok(());
        }
        thread::sleep(REGISTRATION_POLL_INTERVAL);
    }
}
