//! Whole-record JSON persistence and process liveness.

use std::io;
use std::path::Path;

use super::SessionRecord;

/// Persist session metadata, replacing whatever was on disk
pub fn write_meta(meta_path: &Path, record: &SessionRecord) -> io::Result<()> {
    let json = serde_json::to_string_pretty(record).map_err(io::Error::other)?;
    std::fs::write(meta_path, json)
}

/// Read metadata; missing or malformed files read as `None`
pub fn read_meta(meta_path: &Path) -> Option<SessionRecord> {
    let contents = std::fs::read_to_string(meta_path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::debug!(path = %meta_path.display(), error = %err, "unreadable session metadata");
            None
        }
    }
}

/// Check whether a process still exists (signal 0 probe)
#[cfg(unix)]
pub fn is_pid_alive(pid: u32) -> bool {
    // pid 0 is the launch placeholder; kill(0, 0) would probe our own group.
    if pid == 0 || pid > i32::MAX as u32 {
        return false;
    }
    let result = unsafe { libc::kill(pid as i32, 0) };
    result == 0 || io::Error::last_os_error().kind() == io::ErrorKind::PermissionDenied
}

#[cfg(not(unix))]
pub fn is_pid_alive(_pid: u32) -> bool {
    false
}
