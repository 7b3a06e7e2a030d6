//! Default locations for daemon binaries and data.

use std::env;
use std::io;
use std::process;

use camino::Utf8PathBuf;

/// Directory name placed under the process-scoped temporary directory.
pub const DATA_DIR_NAME: &str = "minicluster-data";

/// Directory containing the running executable.
pub(crate) fn deduce_bin_root() -> io::Result<Utf8PathBuf> {
    let exe = utf8(env::current_exe()?)?;
    exe.parent().map(Utf8PathBuf::from).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("executable '{exe}' has no parent directory"),
        )
    })
}

/// `<tmp>/minicluster-<pid>/minicluster-data`.
pub(crate) fn default_data_root() -> io::Result<Utf8PathBuf> {
    let mut root = utf8(env::temp_dir())?;
    root.push(format!("minicluster-{}", process::id()));
    root.push(DATA_DIR_NAME);
    Ok(root)
}

fn utf8(path: std::path::PathBuf) -> io::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("path '{}' is not valid UTF-8", path.display()),
        )
    })
}
