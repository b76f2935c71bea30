//! Configuration system for the `siphon` tool.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::SiphonError;

/// Poll cadence for background log parsing while a command is running.
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 2000;

/// Hard cap for session log files.
pub const DEFAULT_MAX_LOG_BYTES: u64 = 1024 * 1024;

/// Size a log is cut down to once it exceeds the cap.
pub const DEFAULT_TRUNCATE_TO_BYTES: u64 = 512 * 1024;

/// Live monitor settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    /// Milliseconds between log scans while the wrapped command runs
    pub interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        // A zero period would panic inside tokio's interval.
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Log size bounds
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct LogLimits {
    /// Size above which the log is truncated
    pub max_bytes: u64,
    /// Number of trailing bytes kept after truncation
    pub truncate_to_bytes: u64,
}

impl Default for LogLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_LOG_BYTES,
            truncate_to_bytes: DEFAULT_TRUNCATE_TO_BYTES,
        }
    }
}

/// Windows used by the status and output queries
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    /// Lines of log tail scanned for errors by `siphon status`
    pub status_tail_lines: usize,
    /// Lines of log tail printed by `siphon output`
    pub output_tail_lines: usize,
    /// Most recent errors shown per session in the status report
    pub max_errors_per_session: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            status_tail_lines: 200,
            output_tail_lines: 100,
            max_errors_per_session: 5,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<session>.log` and `<session>.meta.json` (default: ~/.siphon)
    pub session_dir: Option<PathBuf>,
    pub monitor: MonitorConfig,
    pub log: LogLimits,
    pub query: QueryConfig,
}

impl Config {
    /// Load config from file, returning default config if file doesn't exist
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load config from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config file");
                Self::default()
            }),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read config file");
                Self::default()
            }
        }
    }

    /// Get the config file path (~/.config/siphon/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("siphon").join("config.toml"))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("SIPHON_DIR") {
            if !dir.trim().is_empty() {
                self.session_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(ms) = env::var("SIPHON_MONITOR_INTERVAL_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.monitor.interval_ms = ms;
        }
    }

    /// Resolve the session directory, falling back to ~/.siphon
    pub fn session_dir(&self) -> Result<PathBuf, SiphonError> {
        if let Some(ref dir) = self.session_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".siphon"))
            .ok_or(SiphonError::NoHomeDir)
    }

    /// Resolve the session directory and make sure it exists
    pub fn ensure_session_dir(&self) -> Result<PathBuf, SiphonError> {
        let dir = self.session_dir()?;
        std::fs::create_dir_all(&dir).map_err(|source| SiphonError::SessionDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }
}

/// Generate default config as TOML string
pub fn generate_default_config() -> String {
    r#"# Siphon - runtime context capture configuration
# Place this file at ~/.config/siphon/config.toml

# Where session logs and metadata live (default: ~/.siphon)
# session_dir = "/home/me/.siphon"

[monitor]
# How often the running command's log is scanned, in milliseconds
interval_ms = 2000

[log]
# Logs larger than this are cut down to their tail
max_bytes = 1048576
# Trailing bytes kept after a cut
truncate_to_bytes = 524288

[query]
# Lines scanned for errors by `siphon status`
status_tail_lines = 200
# Lines printed by `siphon output`
output_tail_lines = 100
# Most recent errors listed per session
max_errors_per_session = 5

# Environment variable overrides:
# SIPHON_DIR=<path>                 - Session directory
# SIPHON_MONITOR_INTERVAL_MS=<ms>   - Monitor poll interval
# SIPHON_LOG=<filter>               - Diagnostic log filter (e.g. debug)
"#
    .to_string()
}

/// Print the default config to stdout
pub fn print_default_config() {
    print!("{}", generate_default_config());
}
