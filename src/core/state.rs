//! Build-state persistence: the last successfully published version.
//!
//! The state file holds a single newline-terminated version string. It is
//! read once per run for the skip decision and replaced atomically (write
//! temp, rename) only after a successful publish, so a crash mid-write
//! never leaves a truncated file behind.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};
use crate::resolver::UNKNOWN_VERSION;

/// Read the previously recorded version. An absent file is no prior
/// version, not an error; unreadable files degrade the same way.
pub fn read_built_version(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let version = content.trim().to_string();
            if version.is_empty() {
                None
            } else {
                Some(version)
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            log_status!("state", "Could not read {}: {} (continuing)", path.display(), e);
            None
        }
    }
}

/// Skip decision: the resolved version is known, matches the recorded
/// one, and force is not set.
pub fn should_skip(resolved: &str, recorded: Option<&str>, force: bool) -> bool {
    resolved != UNKNOWN_VERSION && recorded == Some(resolved) && !force
}

/// Atomically record a published version.
///
/// Writes `<version>\n` to a sibling temp file, then renames over the
/// state file. The rename is the commit point.
pub fn write_built_version(path: &Path, version: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    fs::write(&tmp, format!("{}\n", version)).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("write {}", tmp.display())),
        )
    })?;

    fs::rename(&tmp, path).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("rename {} to {}", tmp.display(), path.display())),
        )
    })?;

    log_status!("state", "Recorded built version {} in {}", version, path.display());
    Ok(())
}
