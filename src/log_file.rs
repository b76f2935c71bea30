//! Session log file helpers: size bounding, tail reads, ANSI stripping.

use regex::Regex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::LazyLock;

use crate::config::LogLimits;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("valid ANSI pattern"));

/// Cut an oversized log down to its trailing bytes.
///
/// Best effort: a missing or unreadable file is a no-op. Returns whether the
/// file was rewritten.
pub fn truncate_log_file(log_path: &Path, limits: LogLimits) -> bool {
    match try_truncate(log_path, limits) {
        Ok(truncated) => truncated,
        Err(err) => {
            tracing::debug!(path = %log_path.display(), error = %err, "log truncation skipped");
            false
        }
    }
}

fn try_truncate(log_path: &Path, limits: LogLimits) -> io::Result<bool> {
    let mut file = File::open(log_path)?;
    let size = file.metadata()?.len();
    if size <= limits.max_bytes {
        return Ok(false);
    }

    let keep = limits.truncate_to_bytes.min(size);
    file.seek(SeekFrom::Start(size - keep))?;
    let mut tail = Vec::with_capacity(keep as usize);
    file.take(keep).read_to_end(&mut tail)?;

    std::fs::write(log_path, &tail)?;
    tracing::debug!(path = %log_path.display(), from = size, to = tail.len(), "truncated session log");
    Ok(true)
}

/// Read the whole log as text, replacing invalid UTF-8
pub fn read_log(log_path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(log_path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Last `count` lines of a file (like `tail -n`); empty on any failure
pub fn get_last_n_lines(log_path: &Path, count: usize) -> String {
    match read_log(log_path) {
        Ok(content) => last_n_lines(&content, count),
        Err(_) => String::new(),
    }
}

fn last_n_lines(content: &str, count: usize) -> String {
    if count == 0 || content.is_empty() {
        return String::new();
    }

    let (body, trailing_newline) = match content.strip_suffix('\n') {
        Some(body) => (body, true),
        None => (content, false),
    };
    let lines: Vec<&str> = body.split('\n').collect();
    let start = lines.len().saturating_sub(count);

    let mut tail = lines[start..].join("\n");
    if trailing_newline {
        tail.push('\n');
    }
    tail
}

/// Remove terminal color and cursor escape sequences
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}
