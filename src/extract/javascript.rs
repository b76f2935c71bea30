//! JavaScript / Node.js errors with trailing `at ...` frames.

use regex::Regex;

use super::{Dialect, ErrorExtractor, Extraction, StackFrameShapes};

pub struct JavaScriptExtractor {
    plain: Regex,
    with_code: Regex,
    uncaught: Regex,
    frames: StackFrameShapes,
}

impl JavaScriptExtractor {
    pub fn new() -> Self {
        Self {
            plain: Regex::new(r"^(\w*Error): (.+)$").expect("valid JS error pattern"),
            with_code: Regex::new(r"^(\w*Error) \[(\w+)\]: (.+)$").expect("valid JS error code pattern"),
            uncaught: Regex::new(r"^Uncaught (\w*Error): (.+)$").expect("valid uncaught pattern"),
            frames: StackFrameShapes::builtin(),
        }
    }

    /// Error type and message from a header line, if it is one
    fn parse_header(&self, line: &str) -> Option<(String, String)> {
        if let Some(caps) = self.plain.captures(line) {
            return Some((caps[1].to_string(), caps[2].to_string()));
        }
        if let Some(caps) = self.with_code.captures(line) {
            return Some((format!("{} [{}]", &caps[1], &caps[2]), caps[3].to_string()));
        }
        self.uncaught
            .captures(line)
            .map(|caps| (format!("Uncaught {}", &caps[1]), caps[2].to_string()))
    }
}

impl Default for JavaScriptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorExtractor for JavaScriptExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::JavaScript
    }

    fn extract(&self, lines: &[&str], index: usize, timestamp: Option<&str>) -> Option<Extraction> {
        let (error_type, message) = self.parse_header(lines[index])?;
        let (block, next_index) = self.frames.collect_after(lines, index);
        Some(Extraction {
            error: block.into_error(timestamp, error_type, message),
            next_index,
        })
    }
}
