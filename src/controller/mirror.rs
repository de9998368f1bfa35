//! # Local Mirror Files
//!
//! Filesystem side of reconciliation. A mirror file is in sync with its stored
//! value when its size equals the payload length and its mtime equals the
//! stored `Modified` time; content is never re-read for comparison.
//!
//! Writes go to a temporary file in the target directory which is fully
//! written, synced and stamped with the stored time before being renamed over
//! the target, so readers only ever see the old or the new content.

use crate::constants::{CERT_DIR_MODE, CERT_FILE_MODE};
use crate::controller::codec::StoredValue;
use std::fs::{self, FileTimes};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[error("failed to {op} {}: {source}", path.display())]
pub struct MirrorError {
    pub op: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl MirrorError {
    fn new(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Create the certificate directory if needed and restrict it to the owner
pub fn ensure_cert_dir(dir: &Path) -> Result<(), MirrorError> {
    fs::create_dir_all(dir).map_err(|e| MirrorError::new("create directory", dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(CERT_DIR_MODE))
            .map_err(|e| MirrorError::new("set permissions on", dir, e))?;
    }

    Ok(())
}

/// Whether the file at `path` already mirrors `stored`
///
/// A missing file is out of sync; other stat failures are errors. The mtime
/// must match to the nanosecond.
pub fn is_in_sync(path: &Path, stored: &StoredValue) -> Result<bool, MirrorError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(MirrorError::new("stat", path, e)),
    };

    if metadata.len() != stored.value.len() as u64 {
        return Ok(false);
    }

    let mtime = metadata
        .modified()
        .map_err(|e| MirrorError::new("read mtime of", path, e))?;
    Ok(mtime == stored.modified_system_time())
}

/// Atomically replace `path` with the stored payload, mode `0600`, times set to `Modified`
pub fn write_atomic(path: &Path, stored: &StoredValue) -> Result<(), MirrorError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(".certwatch-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| MirrorError::new("create temporary file in", dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(CERT_FILE_MODE))
            .map_err(|e| MirrorError::new("set permissions on", tmp.path(), e))?;
    }

    tmp.write_all(&stored.value)
        .map_err(|e| MirrorError::new("write", tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| MirrorError::new("sync", tmp.path(), e))?;

    // Stamp after the last write; rename keeps the times.
    let modified = stored.modified_system_time();
    tmp.as_file()
        .set_times(FileTimes::new().set_accessed(modified).set_modified(modified))
        .map_err(|e| MirrorError::new("set times on", tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|e| MirrorError::new("rename temporary file to", path, e.error))?;

    debug!(path = %path.display(), bytes = stored.value.len(), "Wrote mirror file");
    Ok(())
}

/// Remove a mirror file; returns `false` when it did not exist
pub fn remove(path: &Path) -> Result<bool, MirrorError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(MirrorError::new("remove", path, e)),
    }
}
