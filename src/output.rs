//! Report rendering and terminal output formatting.
//!
//! Reports are rendered to plain strings so they can be asserted on; the
//! `print_*` functions add color and wrapping for the terminal.

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::config::QueryConfig;
use crate::extract::{extract_errors, ParsedError};
use crate::hint::generate_hint;
use crate::log_file::{get_last_n_lines, strip_ansi};
use crate::session::{format_time_ago, SessionEntry, SessionListRow, SessionRecord};

/// Frames shown under each error in the status report
const MAX_FRAMES_PER_ERROR: usize = 5;

/// Errors older than this get a "may already be resolved" note
const STALE_ERROR_MINUTES: i64 = 5;

pub const NO_SESSIONS_MESSAGE: &str = "No siphon sessions found.\n\n\
To start capturing output, run your dev server with siphon:\n  siphon -- npm run dev";

// ============================================================================
// Session list
// ============================================================================

/// Padded cells of one `siphon list` row
struct ListCells {
    session: String,
    status: String,
    port: Option<String>,
    pid: String,
    started: String,
    errors: String,
}

impl ListCells {
    fn padded(row: &SessionListRow) -> Self {
        Self {
            session: format!("{:<20}", row.session),
            status: format!("{:<12}", row.status),
            port: row.port.as_ref().map(|port| format!("{port:<12}")),
            pid: format!("{:<12}", row.pid),
            started: format!("{:<16}", row.started),
            errors: row.errors.clone(),
        }
    }

    /// The port column only appears when known
    fn join(self) -> String {
        let mut parts = vec![self.session, self.status];
        parts.extend(self.port);
        parts.extend([self.pid, self.started, self.errors]);
        parts.join("  ")
    }
}

pub fn format_list_row(row: &SessionListRow) -> String {
    ListCells::padded(row).join()
}

pub fn print_session_list(rows: &[SessionListRow]) {
    if rows.is_empty() {
        println!("No siphon sessions found.");
        return;
    }

    for row in rows {
        let cells = ListCells::padded(row);
        let errors = if row.errors.starts_with("0 ") {
            cells.errors.normal()
        } else {
            cells.errors.red()
        };
        let colored = ListCells {
            session: cells.session.bold().to_string(),
            status: colorize_status(&cells.status),
            port: cells.port.map(|port| port.cyan().to_string()),
            pid: cells.pid.dimmed().to_string(),
            started: cells.started.dimmed().to_string(),
            errors: errors.to_string(),
        };
        println!("{}", colored.join());
    }
}

fn colorize_status(status: &str) -> String {
    if status.starts_with("running") {
        status.green().to_string()
    } else if status.starts_with("exited(0)") {
        status.normal().to_string()
    } else {
        status.yellow().to_string()
    }
}

// ============================================================================
// Status report
// ============================================================================

fn session_header(record: &SessionRecord, now: DateTime<Utc>) -> String {
    let ago = format_time_ago(record.started, now);
    if record.is_running() {
        let port = record
            .port
            .map(|port| format!("port {port}, "))
            .unwrap_or_default();
        format!("{} — running ({port}pid {}, started {ago})", record.session, record.pid)
    } else {
        let exit = match record.exit_code {
            Some(code) => format!("with code {code}"),
            None => "(stale — process no longer running)".to_string(),
        };
        format!("{} — exited {exit} (stopped {ago})", record.session)
    }
}

fn push_error(out: &mut Vec<String>, error: &ParsedError) {
    let timestamp = error
        .timestamp
        .as_ref()
        .map(|ts| format!("[{ts}] "))
        .unwrap_or_default();
    out.push(format!("  {timestamp}{}: {}", error.error_type, error.message));

    for frame in error.stack.iter().take(MAX_FRAMES_PER_ERROR) {
        out.push(format!("    {frame}"));
    }
    if error.stack.len() > MAX_FRAMES_PER_ERROR {
        out.push(format!(
            "    ... and {} more frames",
            error.stack.len() - MAX_FRAMES_PER_ERROR
        ));
    }
    out.push(String::new());
}

/// Note appended to the hint when the latest error may be outdated
fn freshness_suffix(
    latest_error_at: Option<DateTime<Utc>>,
    latest_success_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<String> {
    let error_at = latest_error_at?;
    if latest_success_at.is_some_and(|success_at| success_at > error_at) {
        return Some("(build succeeded since last error — errors may be resolved)".to_string());
    }

    let minutes = (now - error_at).num_minutes();
    (minutes > STALE_ERROR_MINUTES).then(|| format!("(last error {minutes}m ago — may already be resolved)"))
}

/// Health report across sessions: state, recent errors, and a closing hint
pub fn render_status_report(entries: &[&SessionEntry], query: &QueryConfig, now: DateTime<Utc>) -> String {
    let mut out = Vec::new();
    let mut all_errors: Vec<ParsedError> = Vec::new();
    let mut records: Vec<SessionRecord> = Vec::with_capacity(entries.len());
    let mut latest_error_at: Option<DateTime<Utc>> = None;
    let mut latest_success_at: Option<DateTime<Utc>> = None;

    for entry in entries {
        let record = &entry.record;
        out.push(session_header(record, now));

        latest_error_at = latest_error_at.max(record.last_error_at);
        latest_success_at = latest_success_at.max(record.last_success_at);

        let tail = strip_ansi(&get_last_n_lines(&entry.log_path, query.status_tail_lines));
        let errors = extract_errors(&tail);
        let hidden = errors.len().saturating_sub(query.max_errors_per_session);

        if errors.is_empty() {
            out.push("  ✓ No errors detected".to_string());
            out.push(String::new());
        } else {
            let plural = if errors.len() == 1 { "" } else { "s" };
            out.push(format!("  ⚠ {} error{plural} detected:", errors.len()));
            out.push(String::new());

            for error in &errors[hidden..] {
                push_error(&mut out, error);
            }
            if hidden > 0 {
                out.push(format!("  ... and {hidden} more errors — use `siphon output` for full logs"));
                out.push(String::new());
            }
        }

        out.push("---".to_string());
        all_errors.extend(errors);
        records.push(record.clone());
    }

    let mut hint = generate_hint(&all_errors, &records);
    if !hint.is_empty() {
        if let Some(suffix) = freshness_suffix(latest_error_at, latest_success_at, now) {
            hint.push(' ');
            hint.push_str(&suffix);
        }
        out.push(format!("hint: {hint}"));
    }

    out.join("\n")
}

/// Print a rendered status report with color, wrapping the hint to the terminal
pub fn print_status_report(report: &str) {
    let width = textwrap::termwidth().min(100);

    for line in report.lines() {
        if let Some(hint) = line.strip_prefix("hint: ") {
            let options = textwrap::Options::new(width)
                .initial_indent("")
                .subsequent_indent("      ");
            let wrapped = textwrap::fill(&format!("hint: {hint}"), options);
            let body = wrapped.strip_prefix("hint:").unwrap_or(&wrapped);
            println!("{}{}", "hint:".cyan().bold(), body);
        } else if line.starts_with("  ⚠") {
            println!("{}", line.yellow().bold());
        } else if line.starts_with("  ✓") {
            println!("{}", line.green());
        } else if line == "---" {
            println!("{}", line.dimmed());
        } else if line.starts_with("    ") {
            println!("{}", line.dimmed());
        } else if !line.is_empty() && !line.starts_with(' ') {
            println!("{}", line.bold());
        } else {
            println!("{line}");
        }
    }
}

// ============================================================================
// Raw output query
// ============================================================================

/// Tail of a session's log, ANSI-stripped and optionally filtered
pub fn render_output(entry: &SessionEntry, lines: usize, grep: Option<&str>) -> String {
    let session = &entry.record.session;
    if !entry.log_path.exists() {
        return format!("Log file not found for session '{session}'");
    }

    let mut output = strip_ansi(&get_last_n_lines(&entry.log_path, lines));

    if let Some(pattern) = grep.filter(|p| !p.is_empty()) {
        let needle = pattern.to_lowercase();
        let matching: Vec<&str> = output
            .split('\n')
            .filter(|line| line.to_lowercase().contains(&needle))
            .collect();

        if matching.is_empty() {
            return format!("No lines matching '{pattern}' in the last {lines} lines of {session}");
        }
        output = matching.join("\n");
    }

    let filter = grep
        .filter(|p| !p.is_empty())
        .map(|p| format!(", filtered for '{p}'"))
        .unwrap_or_default();
    format!("=== {session} (last {lines} lines{filter}) ===\n\n{output}")
}
