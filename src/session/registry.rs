//! Enumeration of persisted sessions with stale-record healing.

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::paths::{SessionPaths, META_SUFFIX};
use super::store::{is_pid_alive, read_meta, write_meta};
use super::{format_time_ago, SessionRecord, SessionStatus};
use crate::error::SiphonError;

/// One persisted session as seen by the query layer
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub record: SessionRecord,
    pub meta_path: PathBuf,
    pub log_path: PathBuf,
    /// The record claimed `running` but its process was gone and it was rewritten
    pub stale: bool,
}

/// Enumerate all known sessions, healing `running` records whose pid is gone
pub fn get_all_sessions(session_dir: &Path) -> Vec<SessionEntry> {
    get_all_sessions_with(session_dir, is_pid_alive)
}

/// Same as [`get_all_sessions`] with an injectable liveness probe
pub fn get_all_sessions_with(
    session_dir: &Path,
    is_alive: impl Fn(u32) -> bool,
) -> Vec<SessionEntry> {
    let mut meta_paths: Vec<PathBuf> = match std::fs::read_dir(session_dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().ends_with(META_SUFFIX))
                    .unwrap_or(false)
            })
            .collect(),
        Err(_) => return Vec::new(),
    };
    meta_paths.sort();

    let mut sessions = Vec::with_capacity(meta_paths.len());
    for meta_path in meta_paths {
        let Some(mut record) = read_meta(&meta_path) else {
            continue;
        };

        let mut stale = false;
        if record.status == SessionStatus::Running && !is_alive(record.pid) {
            tracing::debug!(session = %record.session, pid = record.pid, "healing stale session");
            record.mark_exited(None);
            stale = true;
            if let Err(err) = write_meta(&meta_path, &record) {
                tracing::warn!(path = %meta_path.display(), error = %err, "could not persist healed session");
            }
        }

        let log_path = SessionPaths::log_path_for_meta(&meta_path);
        sessions.push(SessionEntry {
            record,
            meta_path,
            log_path,
            stale,
        });
    }

    sessions
}

/// Match session names by exact, then prefix, then substring
pub fn fuzzy_match_sessions<'a>(sessions: &'a [SessionEntry], query: &str) -> Vec<&'a SessionEntry> {
    let exact: Vec<_> = sessions
        .iter()
        .filter(|entry| entry.record.session == query)
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let prefix: Vec<_> = sessions
        .iter()
        .filter(|entry| entry.record.session.starts_with(query))
        .collect();
    if !prefix.is_empty() {
        return prefix;
    }

    sessions
        .iter()
        .filter(|entry| entry.record.session.contains(query))
        .collect()
}

/// Resolve a query to exactly one session
pub fn find_session<'a>(
    sessions: &'a [SessionEntry],
    query: &str,
) -> Result<&'a SessionEntry, SiphonError> {
    let matched = fuzzy_match_sessions(sessions, query);
    match matched.as_slice() {
        [single] => Ok(*single),
        [] => Err(SiphonError::SessionNotFound {
            query: query.to_string(),
            available: sessions.iter().map(|e| e.record.session.clone()).collect(),
        }),
        many => Err(SiphonError::AmbiguousSession {
            query: query.to_string(),
            matches: many.iter().map(|e| e.record.session.clone()).collect(),
        }),
    }
}

/// Display row for `siphon list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionListRow {
    pub session: String,
    pub status: String,
    pub port: Option<String>,
    pub pid: String,
    pub started: String,
    pub errors: String,
}

/// Build list rows for every session (healing stale ones on the way)
pub fn list_sessions(session_dir: &Path) -> Vec<SessionListRow> {
    let now = Utc::now();
    get_all_sessions(session_dir)
        .iter()
        .map(|entry| list_row(entry, now))
        .collect()
}

pub fn list_row(entry: &SessionEntry, now: DateTime<Utc>) -> SessionListRow {
    let record = &entry.record;
    let exit_info = if entry.stale {
        "(stale)".to_string()
    } else {
        match (record.status, record.exit_code) {
            (SessionStatus::Exited, Some(code)) => format!("({code})"),
            _ => String::new(),
        }
    };
    let plural = if record.error_count == 1 { "" } else { "s" };

    SessionListRow {
        session: record.session.clone(),
        status: format!("{}{}", record.status, exit_info),
        port: record.port.map(|port| format!("port {port}")),
        pid: format!("pid {}", record.pid),
        started: format!("started {}", format_time_ago(record.started, now)),
        errors: format!("{} error{}", record.error_count, plural),
    }
}

/// Options for the retention sweep
#[derive(Debug, Clone, Copy)]
pub struct CleanOptions {
    /// Files older than this many days are removed
    pub days: u64,
    /// Remove everything regardless of age
    pub all: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self { days: 7, all: false }
    }
}

/// Remove old session files; returns how many were deleted
pub fn clean_sessions(session_dir: &Path, options: CleanOptions) -> io::Result<usize> {
    if !session_dir.exists() {
        return Ok(0);
    }

    let max_age = Duration::from_secs(options.days.saturating_mul(24 * 60 * 60));
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(session_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let expired = options.all || {
            let modified = entry.metadata()?.modified()?;
            now.duration_since(modified).unwrap_or_default() > max_age
        };

        if expired {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn write_session(dir: &Path, name: &str, pid: u32, status: SessionStatus) -> PathBuf {
        let mut record = SessionRecord::new(name, "npm run dev", "/work", Utc::now());
        record.pid = pid;
        record.status = status;
        let paths = SessionPaths::new(dir, name);
        write_meta(&paths.meta_path, &record).unwrap();
        paths.meta_path
    }

    #[test]
    fn test_missing_dir_has_no_sessions() {
        let dir = TempDir::new().unwrap();
        assert!(get_all_sessions(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn test_stale_running_session_is_healed_on_disk() {
        let dir = TempDir::new().unwrap();
        let meta_path = write_session(dir.path(), "web", 4242, SessionStatus::Running);

        let sessions = get_all_sessions_with(dir.path(), |_| false);
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].stale);
        assert_eq!(sessions[0].record.status, SessionStatus::Exited);
        assert!(sessions[0].record.exit_code.is_none());

        let on_disk = read_meta(&meta_path).unwrap();
        assert_eq!(on_disk.status, SessionStatus::Exited);
        assert!(on_disk.exit_code.is_none());
    }

    #[test]
    fn test_live_running_session_is_untouched() {
        let dir = TempDir::new().unwrap();
        write_session(dir.path(), "web", 4242, SessionStatus::Running);

        let sessions = get_all_sessions_with(dir.path(), |pid| pid == 4242);
        assert!(!sessions[0].stale);
        assert!(sessions[0].record.is_running());
    }

    #[test]
    fn test_malformed_and_foreign_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write_session(dir.path(), "api", 1, SessionStatus::Exited);
        std::fs::write(dir.path().join("broken.meta.json"), "{").unwrap();
        std::fs::write(dir.path().join("api.log"), "hello\n").unwrap();

        let sessions = get_all_sessions_with(dir.path(), |_| true);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].record.session, "api");
        assert_eq!(sessions[0].log_path, dir.path().join("api.log"));
    }

    fn entries(names: &[&str]) -> Vec<SessionEntry> {
        names
            .iter()
            .map(|name| SessionEntry {
                record: SessionRecord::new(*name, "x", "/", Utc::now()),
                meta_path: PathBuf::from(format!("/s/{name}.meta.json")),
                log_path: PathBuf::from(format!("/s/{name}.log")),
                stale: false,
            })
            .collect()
    }

    #[test]
    fn test_fuzzy_match_prefers_exact_then_prefix_then_substring() {
        let sessions = entries(&["app:dev", "app:dev-api", "web:app"]);

        let exact = fuzzy_match_sessions(&sessions, "app:dev");
        assert_eq!(exact.len(), 1);

        let prefix = fuzzy_match_sessions(&sessions, "app");
        assert_eq!(prefix.len(), 2);

        let contains = fuzzy_match_sessions(&sessions, "dev-api");
        assert_eq!(contains[0].record.session, "app:dev-api");

        assert!(fuzzy_match_sessions(&sessions, "zzz").is_empty());
    }

    #[test]
    fn test_find_session_reports_ambiguity_and_absence() {
        let sessions = entries(&["app:dev", "app:test"]);
        assert!(matches!(
            find_session(&sessions, "app"),
            Err(SiphonError::AmbiguousSession { .. })
        ));
        assert!(matches!(
            find_session(&sessions, "web"),
            Err(SiphonError::SessionNotFound { .. })
        ));
        assert_eq!(find_session(&sessions, "test").unwrap().record.session, "app:test");
    }

    #[test]
    fn test_list_row_formats_status_and_errors() {
        let started = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut entry = entries(&["app:dev"]).remove(0);
        entry.record.started = started;
        entry.record.pid = 12;
        entry.record.port = Some(3000);
        entry.record.error_count = 1;
        entry.record.mark_exited(Some(2));

        let row = list_row(&entry, started + chrono::Duration::minutes(3));
        assert_eq!(row.status, "exited(2)");
        assert_eq!(row.port.as_deref(), Some("port 3000"));
        assert_eq!(row.pid, "pid 12");
        assert_eq!(row.started, "started 3m ago");
        assert_eq!(row.errors, "1 error");

        entry.stale = true;
        entry.record.exit_code = None;
        entry.record.error_count = 0;
        let row = list_row(&entry, started);
        assert_eq!(row.status, "exited(stale)");
        assert_eq!(row.errors, "0 errors");
    }

    #[test]
    fn test_clean_all_removes_every_file() {
        let dir = TempDir::new().unwrap();
        write_session(dir.path(), "a", 1, SessionStatus::Exited);
        std::fs::write(dir.path().join("a.log"), "x").unwrap();

        let removed = clean_sessions(dir.path(), CleanOptions { days: 7, all: true }).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_clean_keeps_recent_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.log"), "x").unwrap();

        let removed = clean_sessions(dir.path(), CleanOptions::default()).unwrap();
        assert_eq!(removed, 0);
        assert!(dir.path().join("a.log").exists());
    }
}
