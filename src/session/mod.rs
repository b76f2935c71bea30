//! Persisted per-session state.
//!
//! Each wrapped invocation owns one capped log file and one JSON metadata
//! record inside the session directory. This module defines the record and
//! the helpers shared by the launcher, the registry, and the query layer.

pub mod name;
pub mod paths;
pub mod registry;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use name::{extract_command_shortname, session_name};
pub use paths::SessionPaths;
pub use registry::{get_all_sessions, list_sessions, SessionEntry, SessionListRow};
pub use store::{is_pid_alive, read_meta, write_meta};

/// Lifecycle state persisted in the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Exited,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Exited => write!(f, "exited"),
        }
    }
}

/// Session metadata persisted alongside each captured log file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session: String,
    pub command: String,
    pub cwd: String,
    pub started: DateTime<Utc>,
    pub pid: u32,
    pub status: SessionStatus,
    pub exit_code: Option<i32>,
    /// First listening port seen in the output; never overwritten once set
    pub port: Option<u16>,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Fresh record for a command that is about to launch (pid not known yet)
    pub fn new(
        session: impl Into<String>,
        command: impl Into<String>,
        cwd: impl Into<String>,
        started: DateTime<Utc>,
    ) -> Self {
        Self {
            session: session.into(),
            command: command.into(),
            cwd: cwd.into(),
            started,
            pid: 0,
            status: SessionStatus::Running,
            exit_code: None,
            port: None,
            error_count: 0,
            last_error: None,
            last_error_at: None,
            last_success_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Exited with anything but a clean 0, including stale records with no code
    pub fn has_crashed(&self) -> bool {
        self.status == SessionStatus::Exited && self.exit_code != Some(0)
    }

    /// Forget error/success state derived from log output; the port is kept
    pub fn reset_signals(&mut self) {
        self.error_count = 0;
        self.last_error = None;
        self.last_error_at = None;
        self.last_success_at = None;
    }

    /// Finalize the record once the wrapped process is gone
    pub fn mark_exited(&mut self, exit_code: Option<i32>) {
        self.status = SessionStatus::Exited;
        self.exit_code = exit_code;
    }
}

/// Compact relative age such as `42s ago` or `3h ago`
pub fn format_time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}
