//! Worker membership held by a stub coordinator.

use std::sync::{Mutex, MutexGuard, PoisonError};

use minicluster::rpc::WorkerEntry;

/// Latest registration of every worker, keyed by permanent id.
///
/// A re-registration replaces the stored identity and address in place, so
/// listing order is first-registration order.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    entries: Mutex<Vec<WorkerEntry>>,
}

impl WorkerRegistry {
    /// Records `entry`. Returns `true` when the permanent id is new.
    pub fn register(&self, entry: WorkerEntry) -> bool {
        let mut entries = self.lock();
        let existing = entries.iter_mut().find(|known| {
            known.instance_id.permanent_uuid == entry.instance_id.permanent_uuid
        });
        match existing {
            Some(known) => {
                *known = entry;
                false
            }
            None => {
                entries.push(entry);
                true
            }
        }
    }

    /// Copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WorkerEntry> {
        self.lock().clone()
    }

    /// Number of distinct workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` before the first registration.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WorkerEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use minicluster::{DaemonIdentity, HostPort};

    use super::*;

    fn entry(uuid: &str, seqno: u64, port: u16) -> WorkerEntry {
        WorkerEntry {
            instance_id: DaemonIdentity::new(uuid, seqno),
            rpc_address: HostPort::loopback(port),
        }
    }

    #[test]
    fn reregistration_replaces_the_stale_incarnation() {
        let registry = WorkerRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.register(entry("a", 1, 100)));
        assert!(registry.register(entry("b", 1, 200)));
        assert!(!registry.register(entry("a", 2, 101)));

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.snapshot(),
            vec![entry("a", 2, 101), entry("b", 1, 200)]
        );
    }
}
