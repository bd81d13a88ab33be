//! Per-check log persistence.
//!
//! The combined output of the most recent execution lands in
//! `.vibeguard/log/<check-id>.log`, verbatim, no header. Writes are
//! best-effort: a read-only working directory (some CI caches) must not
//! change the run result, so I/O failures are logged at debug and swallowed.

use std::path::{Path, PathBuf};
use tracing::debug;

pub const LOG_DIR: &str = ".vibeguard/log";

/// Path a check's log will be written to, relative to `workdir`.
pub fn log_path(workdir: &Path, check_id: &str) -> PathBuf {
    workdir.join(LOG_DIR).join(format!("{}.log", check_id))
}

/// Overwrite the check's log with `combined`. Failures are swallowed.
pub fn write_log(workdir: &Path, check_id: &str, combined: &str) -> PathBuf {
    let path = log_path(workdir, check_id);
    let attempt = (|| -> std::io::Result<()> {
        std::fs::create_dir_all(workdir.join(LOG_DIR))?;
        std::fs::write(&path, combined)
    })();
    if let Err(e) = attempt {
        debug!(check_id, error = %e, "log write failed");
    }
    path
}
