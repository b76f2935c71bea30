//! Per-line runtime signal detection.
//!
//! Three independent ordered pattern tables decide whether a line of output
//! announces a listening port, an error, or a successful build/startup. The
//! tables are plain data built once and passed by reference; the functions
//! here hold no state of their own.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::session::SessionRecord;

/// Lowest port accepted as a real listening port
pub const MIN_PORT: u32 = 1000;

/// Characters of the offending line kept in `lastError`
pub const LAST_ERROR_MAX_CHARS: usize = 200;

const PORT_PATTERNS: &[&str] = &[
    r"(?i)(?:localhost|127\.0\.0\.1|0\.0\.0\.0)[:\s]+(\d{4,5})",
    r":(\d{4,5})\b",
    r"(?i)port\s+(\d{4,5})",
    r"(?i)listening\s+(?:on\s+)?(?:port\s+)?(\d{4,5})",
];

const ERROR_PATTERNS: &[&str] = &[
    r"^(Error|TypeError|ReferenceError|SyntaxError|RangeError|URIError|EvalError):",
    r"E(CONNREFUSED|NOTFOUND|ACCES|ADDRINUSE|PERM|NOENT)",
    r"^Traceback \(most recent call last\)",
    r"panic:",
    r"^error\[E\d+\]",
    r"(?i)\b(FATAL|CRITICAL)\b",
    r"(?i)^error:",
    r"(?i)failed to compile",
    r"(?i)compilation failed",
    r"(?i)build failed",
    r"(?i)UnhandledPromiseRejection",
    r"(?i)Uncaught \w*Error",
];

const SUCCESS_PATTERNS: &[&str] = &[
    r"(?i)compiled successfully",
    r"(?i)compiled client and server successfully",
    r"(?i)ready in \d+m?s",
    r"(?i)build completed",
    r"(?i)watching for file changes",
    r"(?i)compiled.*in \d+m?s",
    r"(?i)webpack.*compiled",
    r"(?i)vite.*ready",
    r"(?i)✓ ready",
    r"(?i)server started",
    r"(?i)listening on",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("built-in signal pattern must compile"))
        .collect()
}

/// Ordered port / error / success tables
#[derive(Debug, Clone)]
pub struct SignalPatterns {
    pub port: Vec<Regex>,
    pub error: Vec<Regex>,
    pub success: Vec<Regex>,
}

impl SignalPatterns {
    /// The built-in tables tuned for common dev-server output
    pub fn builtin() -> Self {
        Self {
            port: compile(PORT_PATTERNS),
            error: compile(ERROR_PATTERNS),
            success: compile(SUCCESS_PATTERNS),
        }
    }

    /// First in-range port announced by the line
    pub fn detect_port(&self, line: &str) -> Option<u16> {
        self.port.iter().find_map(|pattern| {
            let digits = pattern.captures(line)?.get(1)?.as_str();
            let port: u32 = digits.parse().ok()?;
            if (MIN_PORT..=u16::MAX as u32).contains(&port) {
                u16::try_from(port).ok()
            } else {
                None
            }
        })
    }

    pub fn is_error_line(&self, line: &str) -> bool {
        self.error.iter().any(|pattern| pattern.is_match(line))
    }

    pub fn is_success_line(&self, line: &str) -> bool {
        self.success.iter().any(|pattern| pattern.is_match(line))
    }

    /// Fold one line of output into the session record.
    ///
    /// The port is only taken while unset. Success is applied before error, so
    /// a line matching both leaves the record in the error state. Returns
    /// whether anything changed.
    pub fn apply_line(&self, record: &mut SessionRecord, line: &str, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        if record.port.is_none() {
            if let Some(port) = self.detect_port(line) {
                record.port = Some(port);
                changed = true;
            }
        }

        if self.is_success_line(line) {
            record.error_count = 0;
            record.last_error = None;
            record.last_error_at = None;
            record.last_success_at = Some(now);
            changed = true;
        }

        if self.is_error_line(line) {
            record.error_count = record.error_count.saturating_add(1);
            record.last_error = Some(line.chars().take(LAST_ERROR_MAX_CHARS).collect());
            record.last_error_at = Some(now);
            changed = true;
        }

        changed
    }
}

impl Default for SignalPatterns {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord::new("app:dev", "npm run dev", "/app", Utc::now())
    }

    #[test]
    fn test_port_from_listening_line() {
        let patterns = SignalPatterns::builtin();
        assert_eq!(patterns.detect_port("listening on port 4321"), Some(4321));
        assert_eq!(patterns.detect_port("  ➜  Local:   http://localhost:5173/"), Some(5173));
        assert_eq!(patterns.detect_port("Server at 0.0.0.0 8080"), Some(8080));
    }

    #[test]
    fn test_port_out_of_range_is_rejected() {
        let patterns = SignalPatterns::builtin();
        assert_eq!(patterns.detect_port("port 99999"), None);
        assert_eq!(patterns.detect_port("port 12"), None);
        assert_eq!(patterns.detect_port("no numbers here"), None);
    }

    #[test]
    fn test_out_of_range_match_falls_through_to_later_pattern() {
        let patterns = SignalPatterns::builtin();
        // `:0999` is rejected by the colon pattern, `port 3001` still wins.
        assert_eq!(patterns.detect_port("retry :0999 then port 3001"), Some(3001));
    }

    #[test]
    fn test_error_lines() {
        let patterns = SignalPatterns::builtin();
        assert!(patterns.is_error_line("TypeError: x is not a function"));
        assert!(patterns.is_error_line("connect ECONNREFUSED 127.0.0.1:5432"));
        assert!(patterns.is_error_line("Traceback (most recent call last):"));
        assert!(patterns.is_error_line("error[E0382]: borrow of moved value"));
        assert!(patterns.is_error_line("[app] fatal: out of memory"));
        assert!(patterns.is_error_line("Failed to compile."));
        assert!(!patterns.is_error_line("GET /api/users 200 12ms"));
    }

    #[test]
    fn test_success_lines() {
        let patterns = SignalPatterns::builtin();
        assert!(patterns.is_success_line("Compiled successfully"));
        assert!(patterns.is_success_line("  VITE v5.0.0  ready in 312 ms"));
        assert!(patterns.is_success_line("Server started on :3000"));
        assert!(!patterns.is_success_line("Compiling..."));
    }

    #[test]
    fn test_success_resets_error_state() {
        let patterns = SignalPatterns::builtin();
        let mut rec = record();
        let now = Utc::now();
        for _ in 0..3 {
            patterns.apply_line(&mut rec, "Error: boom", now);
        }
        assert_eq!(rec.error_count, 3);

        let later = now + chrono::Duration::seconds(1);
        assert!(patterns.apply_line(&mut rec, "Compiled successfully", later));
        assert_eq!(rec.error_count, 0);
        assert!(rec.last_error.is_none());
        assert!(rec.last_error_at.is_none());
        assert_eq!(rec.last_success_at, Some(later));
    }

    #[test]
    fn test_line_matching_both_ends_in_error_state() {
        let patterns = SignalPatterns::builtin();
        let mut rec = record();
        rec.error_count = 4;
        patterns.apply_line(&mut rec, "error: build completed with warnings", Utc::now());

        assert_eq!(rec.error_count, 1);
        assert_eq!(rec.last_error.as_deref(), Some("error: build completed with warnings"));
        assert!(rec.last_success_at.is_some());
    }

    #[test]
    fn test_last_error_is_truncated_to_200_chars() {
        let patterns = SignalPatterns::builtin();
        let mut rec = record();
        let line = format!("Error: {}", "é".repeat(500));
        patterns.apply_line(&mut rec, &line, Utc::now());
        assert_eq!(rec.last_error.unwrap().chars().count(), LAST_ERROR_MAX_CHARS);
    }

    #[test]
    fn test_port_is_set_once() {
        let patterns = SignalPatterns::builtin();
        let mut rec = record();
        assert!(patterns.apply_line(&mut rec, "listening on port 3000", Utc::now()));
        patterns.apply_line(&mut rec, "also serving on port 4000", Utc::now());
        assert_eq!(rec.port, Some(3000));
    }

    #[test]
    fn test_plain_line_changes_nothing() {
        let patterns = SignalPatterns::builtin();
        let mut rec = record();
        let before = rec.clone();
        assert!(!patterns.apply_line(&mut rec, "GET / 200", Utc::now()));
        assert_eq!(rec, before);
    }
}
