//! Patch Applier - replace a file's contents with a backup to fall back on
//!
//! `<path>.bak` is written before the target is touched and is left in
//! place afterwards; the session workspace removes it at terminal state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sibling backup path: `<path>.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Back up `path`, then overwrite it with `new_code`.
///
/// Returns `false` if the backup could not be made (target untouched) or if
/// the write failed (target restored byte-for-byte from the backup).
pub fn apply(path: &Path, new_code: &str) -> bool {
    apply_with(path, new_code, |p, code| fs::write(p, code))
}

/// [`apply`] with a caller-supplied writer.
pub fn apply_with<W>(path: &Path, new_code: &str, write: W) -> bool
where
    W: FnOnce(&Path, &str) -> io::Result<()>,
{
    let backup = backup_path(path);
    if let Err(e) = fs::copy(path, &backup) {
        log::error!("Failed to back up {}: {}", path.display(), e);
        return false;
    }
    log::info!("Created backup at {}", backup.display());

    match write(path, new_code) {
        Ok(()) => {
            log::info!("Applied patch to {}", path.display());
            true
        }
        Err(e) => {
            log::error!("Failed to apply patch to {}: {}", path.display(), e);
            if let Err(restore) = fs::copy(&backup, path) {
                log::error!("Failed to restore {} from backup: {}", path.display(), restore);
            } else {
                log::info!("Restored {} from backup", path.display());
            }
            false
        }
    }
}
