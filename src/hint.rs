//! One-sentence next-step hint built from extracted errors and session state.

use regex::Regex;
use std::sync::LazyLock;

use crate::extract::ParsedError;
use crate::session::SessionRecord;

pub const ALL_CLEAR_HINT: &str = "All processes running normally. No errors in recent output.";

static DUPLICATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \(×\d+\)$").expect("valid duplicate suffix pattern"));

/// Shapes of a top frame that name a file and line, tried in order
static FRAME_LOCATIONS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"\((.+):(\d+):\d+\)").expect("valid frame pattern"),
        Regex::new(r"at (.+):(\d+):\d+").expect("valid frame pattern"),
        Regex::new(r#"File "(.+)", line (\d+)"#).expect("valid frame pattern"),
    ]
});

static PORT_IN_MESSAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(\d+)").expect("valid port pattern"));

/// Summarize the most recent error into an actionable hint.
///
/// With no errors, returns the all-clear message when every session is
/// running, otherwise an empty string.
pub fn generate_hint(errors: &[ParsedError], sessions: &[SessionRecord]) -> String {
    let Some(latest) = errors.last() else {
        let all_running = !sessions.is_empty() && sessions.iter().all(SessionRecord::is_running);
        return if all_running {
            ALL_CLEAR_HINT.to_string()
        } else {
            String::new()
        };
    };

    let mut parts = vec![format!(
        "Most recent error: {}: {}",
        latest.error_type,
        DUPLICATE_SUFFIX.replace(&latest.message, "")
    )];

    if let Some((file, line)) = latest.stack.first().and_then(|frame| frame_location(frame)) {
        parts.push(format!("Consider investigating {file} around line {line}."));
    }

    parts.extend(canned_suggestions(latest));

    let crashed = sessions.iter().filter(|s| s.has_crashed()).count();
    if crashed > 0 {
        parts.push(format!("{crashed} process(es) have crashed and may need restart."));
    }

    parts.join(" ")
}

fn frame_location(frame: &str) -> Option<(&str, &str)> {
    FRAME_LOCATIONS.iter().find_map(|pattern| {
        let caps = pattern.captures(frame)?;
        Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    })
}

fn canned_suggestions(error: &ParsedError) -> Vec<String> {
    let mentions = |code: &str| error.message.contains(code) || error.error_type == code;
    let mut suggestions = Vec::new();

    if mentions("ECONNREFUSED") {
        let port = PORT_IN_MESSAGE
            .captures(&error.message)
            .and_then(|caps| caps.get(1))
            .map_or("?", |m| m.as_str());
        suggestions.push(format!("Check if the service on port {port} is running."));
    }

    if error.error_type == "SyntaxError" {
        suggestions.push("This is likely a syntax issue in the source code.".to_string());
    }

    if mentions("EADDRINUSE") {
        suggestions.push(
            "The port is already in use. Kill the existing process or use a different port."
                .to_string(),
        );
    }

    if mentions("ENOENT") {
        suggestions
            .push("A file or directory was not found. Check that all paths exist.".to_string());
    }

    if error.error_type == "TypeError" && error.message.contains("undefined") {
        suggestions.push(
            "A value is undefined when it shouldn't be. Check for null/undefined handling."
                .to_string(),
        );
    }

    suggestions
}
