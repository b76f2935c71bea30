//! Python tracebacks.

use regex::Regex;

use super::{Block, Dialect, ErrorExtractor, Extraction};

pub struct PythonExtractor {
    start: Regex,
    frame: Regex,
    /// Exception line that ends the frame/source-line alternation
    exception_start: Regex,
    error_line: Regex,
    exception_line: Regex,
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self {
            start: Regex::new(r"^Traceback \(most recent call last\):$").expect("valid traceback pattern"),
            frame: Regex::new(r#"^\s+File ".+", line \d+"#).expect("valid frame pattern"),
            exception_start: Regex::new(r"^\w+Error:|^\w+Exception:").expect("valid exception pattern"),
            error_line: Regex::new(r"^(\w+Error): (.+)$").expect("valid error line pattern"),
            exception_line: Regex::new(r"^(\w+Exception): (.+)$").expect("valid exception line pattern"),
        }
    }

    fn is_frame(&self, line: &str) -> bool {
        self.frame.is_match(line) || line.trim().starts_with("File ")
    }

    /// Type and message of the closing exception line
    fn parse_exception(&self, line: &str) -> (String, String) {
        self.error_line
            .captures(line)
            .or_else(|| self.exception_line.captures(line))
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .unwrap_or_else(|| ("Error".to_string(), line.to_string()))
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorExtractor for PythonExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::Python
    }

    fn extract(&self, lines: &[&str], index: usize, timestamp: Option<&str>) -> Option<Extraction> {
        if !self.start.is_match(lines[index]) {
            return None;
        }

        let mut block = Block::starting_with(lines[index]);
        let mut next = index + 1;

        while next < lines.len() && self.is_frame(lines[next]) {
            block.push_frame(lines[next]);
            next += 1;

            // The source line echoed under a frame is kept in raw only.
            if next < lines.len()
                && !self.frame.is_match(lines[next])
                && !self.exception_start.is_match(lines[next])
            {
                block.push_raw(lines[next]);
                next += 1;
            }
        }

        let (error_type, message) = match lines.get(next) {
            Some(line) => {
                block.push_raw(line);
                next += 1;
                self.parse_exception(line)
            }
            None => ("Error".to_string(), String::new()),
        };

        Some(Extraction {
            error: block.into_error(timestamp, error_type, message),
            next_index: next,
        })
    }
}
