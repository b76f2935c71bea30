//! Error extraction from mixed-language log output.
//!
//! This module turns a window of raw log text into normalized error records:
//! - An ordered list of dialect extractors (JavaScript/Node, Python, Go, Rust,
//!   then generic/system lines) is tried at every line; the first one that
//!   accepts consumes the header plus any stack lines that follow
//! - A leading timestamp, if present, is attached to the record
//! - Repeated errors collapse into one record that keeps its first position,
//!   carries the latest occurrence's content, and is suffixed with `(×N)`

pub mod generic;
pub mod go;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod stack;

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

pub use generic::GenericExtractor;
pub use go::GoExtractor;
pub use javascript::JavaScriptExtractor;
pub use python::PythonExtractor;
pub use rust::RustExtractor;
pub use stack::StackFrameShapes;

// ============================================================================
// Core Types
// ============================================================================

/// Error dialects recognized by the extractors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    JavaScript,
    Python,
    Go,
    Rust,
    Generic,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::JavaScript => write!(f, "javascript"),
            Dialect::Python => write!(f, "python"),
            Dialect::Go => write!(f, "go"),
            Dialect::Rust => write!(f, "rust"),
            Dialect::Generic => write!(f, "generic"),
        }
    }
}

/// One normalized runtime error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedError {
    /// Timestamp found at the start of the header line, if any
    pub timestamp: Option<String>,
    /// Error kind, e.g. `TypeError`, `panic`, `ECONNREFUSED`
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    /// Trimmed stack/context lines that followed the header
    pub stack: Vec<String>,
    /// The verbatim source block
    pub raw: String,
}

impl ParsedError {
    /// Single-line error with no stack
    pub fn single_line(
        timestamp: Option<&str>,
        error_type: impl Into<String>,
        message: impl Into<String>,
        raw: &str,
    ) -> Self {
        Self {
            timestamp: timestamp.map(str::to_string),
            error_type: error_type.into(),
            message: message.into(),
            stack: Vec::new(),
            raw: raw.to_string(),
        }
    }

    /// Identity used for deduplication
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.error_type, self.message)
    }
}

/// An accepted error plus the index of the first line it did not consume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub error: ParsedError,
    pub next_index: usize,
}

/// Header line plus the stack lines gathered after it
#[derive(Debug, Default)]
pub(crate) struct Block {
    pub stack: Vec<String>,
    pub raw: Vec<String>,
}

impl Block {
    pub fn starting_with(header: &str) -> Self {
        Self {
            stack: Vec::new(),
            raw: vec![header.to_string()],
        }
    }

    /// Consume a line as a stack frame (trimmed) and raw text (verbatim)
    pub fn push_frame(&mut self, line: &str) {
        self.stack.push(line.trim().to_string());
        self.raw.push(line.to_string());
    }

    /// Consume a line as raw text only
    pub fn push_raw(&mut self, line: &str) {
        self.raw.push(line.to_string());
    }

    pub fn into_error(
        self,
        timestamp: Option<&str>,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> ParsedError {
        ParsedError {
            timestamp: timestamp.map(str::to_string),
            error_type: error_type.into(),
            message: message.into(),
            stack: self.stack,
            raw: self.raw.join("\n"),
        }
    }
}

// ============================================================================
// Extractor Trait and Registry
// ============================================================================

/// Trait for dialect-specific error extractors
pub trait ErrorExtractor: Send + Sync {
    /// The dialect this extractor handles
    fn dialect(&self) -> Dialect;

    /// Try to read one error starting at `lines[index]`.
    /// Returns None if the line does not open an error in this dialect.
    fn extract(&self, lines: &[&str], index: usize, timestamp: Option<&str>) -> Option<Extraction>;
}

/// Timestamp shapes recognized at the start of a line
#[derive(Debug, Clone)]
pub struct TimestampPatterns {
    patterns: Vec<Regex>,
}

impl TimestampPatterns {
    pub fn builtin() -> Self {
        let patterns = [
            r"^\[(\d{2}:\d{2}:\d{2})\]",
            r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})",
            r"^(\d{2}:\d{2}:\d{2}\.\d{3})",
            r"^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\]",
        ];
        Self {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("built-in timestamp pattern must compile"))
                .collect(),
        }
    }

    /// Pull a readable timestamp out of a line; first matching shape wins
    pub fn extract<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.patterns
            .iter()
            .find_map(|pattern| pattern.captures(line)?.get(1).map(|m| m.as_str()))
    }
}

impl Default for TimestampPatterns {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Ordered extractor cascade; the first extractor to accept a line wins
pub struct ErrorExtractorRegistry {
    extractors: Vec<Box<dyn ErrorExtractor>>,
    timestamps: TimestampPatterns,
}

impl ErrorExtractorRegistry {
    /// Create a registry with no extractors
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
            timestamps: TimestampPatterns::builtin(),
        }
    }

    /// Create a registry with all built-in extractors in priority order
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(JavaScriptExtractor::new()));
        registry.register(Box::new(PythonExtractor::new()));
        registry.register(Box::new(GoExtractor::new()));
        registry.register(Box::new(RustExtractor::new()));
        registry.register(Box::new(GenericExtractor::new()));
        registry
    }

    /// Append an extractor at the lowest priority
    pub fn register(&mut self, extractor: Box<dyn ErrorExtractor>) {
        self.extractors.push(extractor);
    }

    /// Dialects in the order they are tried
    pub fn dialects(&self) -> Vec<Dialect> {
        self.extractors.iter().map(|e| e.dialect()).collect()
    }

    /// Parse log text into deduplicated error records in first-seen order
    pub fn extract(&self, log_content: &str) -> Vec<ParsedError> {
        let lines: Vec<&str> = log_content
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .collect();
        let mut dedup = Deduplicator::default();

        let mut index = 0;
        while index < lines.len() {
            let timestamp = self.timestamps.extract(lines[index]);
            let accepted = self
                .extractors
                .iter()
                .find_map(|extractor| extractor.extract(&lines, index, timestamp));

            match accepted {
                // Always make progress, even if an extractor reports no consumption.
                Some(extraction) => {
                    index = extraction.next_index.max(index + 1);
                    dedup.add(extraction.error);
                }
                None => index += 1,
            }
        }

        dedup.finish()
    }
}

impl Default for ErrorExtractorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Parse mixed-language logs with the built-in extractors
pub fn extract_errors(log_content: &str) -> Vec<ParsedError> {
    ErrorExtractorRegistry::with_builtins().extract(log_content)
}

// ============================================================================
// Deduplication
// ============================================================================

/// Keeps first-seen order while letting later occurrences replace content
#[derive(Default)]
struct Deduplicator {
    errors: Vec<ParsedError>,
    /// key -> (position in `errors`, occurrences)
    seen: HashMap<String, (usize, usize)>,
}

impl Deduplicator {
    fn add(&mut self, error: ParsedError) {
        let key = error.dedup_key();
        match self.seen.get_mut(&key) {
            Some((position, count)) => {
                self.errors[*position] = error;
                *count += 1;
            }
            None => {
                self.seen.insert(key, (self.errors.len(), 1));
                self.errors.push(error);
            }
        }
    }

    fn finish(self) -> Vec<ParsedError> {
        let Deduplicator { mut errors, seen } = self;
        for (position, count) in seen.into_values() {
            if count > 1 {
                let error = &mut errors[position];
                error.message = format!("{} (×{})", error.message, count);
            }
        }
        errors
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_priority_order() {
        let registry = ErrorExtractorRegistry::with_builtins();
        assert_eq!(
            registry.dialects(),
            vec![
                Dialect::JavaScript,
                Dialect::Python,
                Dialect::Go,
                Dialect::Rust,
                Dialect::Generic
            ]
        );
    }

    #[test]
    fn test_empty_registry_finds_nothing() {
        let registry = ErrorExtractorRegistry::new();
        assert!(registry.extract("Error: boom").is_empty());
    }

    #[test]
    fn test_js_error_with_stack() {
        let errors = extract_errors("Error: boom\n  at foo (/a.js:1:2)\n  at bar (/a.js:3:4)");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, "Error");
        assert_eq!(errors[0].message, "boom");
        assert_eq!(
            errors[0].stack,
            vec!["at foo (/a.js:1:2)".to_string(), "at bar (/a.js:3:4)".to_string()]
        );
        assert_eq!(
            errors[0].raw,
            "Error: boom\n  at foo (/a.js:1:2)\n  at bar (/a.js:3:4)"
        );
    }

    #[test]
    fn test_duplicate_errors_collapse_with_count() {
        let log = "TypeError: x is undefined\nserver restarted\nTypeError: x is undefined";
        let errors = extract_errors(log);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "x is undefined (×2)");
    }

    #[test]
    fn test_crlf_lines_dedup_with_plain_lines() {
        let errors = extract_errors("TypeError: x is undefined\r\nTypeError: x is undefined\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, "TypeError");
        assert_eq!(errors[0].message, "x is undefined (×2)");
        assert!(!errors[0].raw.contains('\r'));
    }

    #[test]
    fn test_duplicate_keeps_first_position_and_latest_content() {
        let log = "Error: boom\nfatal error: out of memory\nError: boom\n  at retry (/srv/job.js:9:1)";
        let errors = extract_errors(log);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].error_type, "Error");
        assert_eq!(errors[0].message, "boom (×2)");
        assert_eq!(errors[0].timestamp, None);
        assert_eq!(errors[0].stack, vec!["at retry (/srv/job.js:9:1)".to_string()]);
        assert_eq!(errors[1].error_type, "fatal error");
    }

    #[test]
    fn test_no_two_records_share_a_key() {
        let log = "Error: a\nError: b\nError: a\nECONNREFUSED\nError: b\nError: a";
        let errors = extract_errors(log);
        let mut keys: Vec<String> = errors.iter().map(|e| e.dedup_key()).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(errors[0].message, "a (×3)");
        assert_eq!(errors[1].message, "b (×2)");
    }

    #[test]
    fn test_timestamp_shapes() {
        let ts = TimestampPatterns::builtin();
        assert_eq!(ts.extract("[12:34:56] Error: x"), Some("12:34:56"));
        assert_eq!(ts.extract("2025-01-02T03:04:05.123Z Error: x"), Some("2025-01-02T03:04:05"));
        assert_eq!(ts.extract("12:34:56.789 panic"), Some("12:34:56.789"));
        assert_eq!(ts.extract("[2025-01-02 03:04:05] FATAL"), Some("2025-01-02 03:04:05"));
        assert_eq!(ts.extract("Error: no time"), None);
    }

    #[test]
    fn test_timestamped_generic_error_keeps_timestamp() {
        let errors = extract_errors("[2025-01-02 03:04:05] FATAL database unreachable");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, "FATAL");
        assert_eq!(errors[0].timestamp.as_deref(), Some("2025-01-02 03:04:05"));
    }

    #[test]
    fn test_mixed_dialects_in_order() {
        let log = "\
Traceback (most recent call last):
  File \"app.py\", line 3, in <module>
    main()
ValueError: bad input
panic: nil map write
goroutine 1 [running]:
thread 'main' panicked at src/main.rs:4:5:
error: could not compile `demo`
connect ECONNREFUSED 127.0.0.1:6379";
        let errors = extract_errors(log);
        let types: Vec<&str> = errors.iter().map(|e| e.error_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["ValueError", "panic", "panic", "error", "ECONNREFUSED"]
        );
    }

    #[test]
    fn test_parsed_error_serializes_type_field() {
        let error = ParsedError::single_line(None, "ENOENT", "missing", "missing");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "ENOENT");
        assert_eq!(json["timestamp"], serde_json::Value::Null);
    }
}
