//! Fixture daemons and temporary data roots.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use tempfile::TempDir;

use crate::daemon::ExternalDaemon;

const FIXTURES: [&str; 4] = ["ready.sh", "exit.sh", "never_ready.sh", "corrupt.sh"];

static FIXTURE_DIR: Lazy<Utf8PathBuf> = Lazy::new(|| {
    let dir = Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    for name in FIXTURES {
        let path = dir.join(name);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|error| panic!("failed to mark {path} executable: {error}"));
    }
    dir
});

/// Budget used where a test expects readiness to fail quickly.
pub(crate) const SHORT_TIMEOUT: Duration = Duration::from_millis(300);

/// Path of an executable fixture script.
pub(crate) fn fixture(name: &str) -> Utf8PathBuf {
    FIXTURE_DIR.join(name)
}

/// Temporary directory with a UTF-8 path.
pub(crate) struct DataRoot {
    dir: TempDir,
}

impl DataRoot {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create data root"),
        }
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        Utf8Path::from_path(self.dir.path()).expect("temp dir path is UTF-8")
    }

    pub(crate) fn join(&self, name: &str) -> Utf8PathBuf {
        self.path().join(name)
    }
}

/// Daemon backed by fixture `script` with data under `root/name`.
pub(crate) fn daemon(root: &DataRoot, script: &str, name: &str, extra: &[&str]) -> ExternalDaemon {
    ExternalDaemon::new(
        fixture(script),
        root.join(name),
        extra.iter().map(|flag| (*flag).to_owned()).collect(),
    )
}

/// Directory holding every fixture script, usable as a binary root.
pub(crate) fn fixture_dir() -> Utf8PathBuf {
    FIXTURE_DIR.clone()
}
