//! Single-line system, log-level, and build-failure errors.

use regex::Regex;

use super::{Dialect, ErrorExtractor, Extraction, ParsedError};

pub struct GenericExtractor {
    system: Regex,
    log_level: Regex,
    error_prefix: Regex,
    build_failures: Vec<Regex>,
}

impl GenericExtractor {
    pub fn new() -> Self {
        let build_failures = [r"(?i)failed to compile", r"(?i)compilation failed", r"(?i)build failed"];
        Self {
            system: Regex::new(r"E(CONNREFUSED|NOTFOUND|ACCES|ADDRINUSE|PERM|NOENT)")
                .expect("valid system error pattern"),
            log_level: Regex::new(r"(?i)\b(FATAL|CRITICAL)\b").expect("valid log level pattern"),
            error_prefix: Regex::new(r"(?i)^error: (.+)$").expect("valid error prefix pattern"),
            build_failures: build_failures
                .iter()
                .map(|p| Regex::new(p).expect("valid build failure pattern"))
                .collect(),
        }
    }

    /// Classify one line as (type, message)
    fn classify(&self, line: &str) -> Option<(String, String)> {
        if let Some(caps) = self.system.captures(line) {
            return Some((format!("E{}", &caps[1]), line.to_string()));
        }
        if let Some(caps) = self.log_level.captures(line) {
            return Some((caps[1].to_uppercase(), line.to_string()));
        }
        if let Some(caps) = self.error_prefix.captures(line) {
            return Some(("error".to_string(), caps[1].to_string()));
        }
        self.build_failures
            .iter()
            .any(|pattern| pattern.is_match(line))
            .then(|| ("build error".to_string(), line.to_string()))
    }
}

impl Default for GenericExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorExtractor for GenericExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::Generic
    }

    fn extract(&self, lines: &[&str], index: usize, timestamp: Option<&str>) -> Option<Extraction> {
        let line = lines[index];
        let (error_type, message) = self.classify(line)?;
        Some(Extraction {
            error: ParsedError::single_line(timestamp, error_type, message, line),
            next_index: index + 1,
        })
    }
}
