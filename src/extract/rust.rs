//! Rust panics and compiler diagnostics.

use regex::Regex;

use super::{Block, Dialect, ErrorExtractor, Extraction};

pub struct RustExtractor {
    panic: Regex,
    backtrace_frame: Regex,
    compiler: Regex,
}

impl RustExtractor {
    pub fn new() -> Self {
        Self {
            panic: Regex::new(r"^thread '.+' panicked at (.+)$").expect("valid panic pattern"),
            backtrace_frame: Regex::new(r"^\s+\d+:").expect("valid backtrace pattern"),
            compiler: Regex::new(r"^error\[E\d+\]: (.+)$").expect("valid compiler pattern"),
        }
    }

    fn collect(
        lines: &[&str],
        index: usize,
        mut continues: impl FnMut(&str) -> bool,
    ) -> (Block, usize) {
        let mut block = Block::starting_with(lines[index]);
        let mut next = index + 1;
        while next < lines.len() && continues(lines[next]) {
            block.push_frame(lines[next]);
            next += 1;
        }
        (block, next)
    }
}

impl Default for RustExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorExtractor for RustExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::Rust
    }

    fn extract(&self, lines: &[&str], index: usize, timestamp: Option<&str>) -> Option<Extraction> {
        let line = lines[index];

        if let Some(caps) = self.panic.captures(line) {
            let (block, next_index) =
                Self::collect(lines, index, |l| self.backtrace_frame.is_match(l));
            return Some(Extraction {
                error: block.into_error(timestamp, "panic", &caps[1]),
                next_index,
            });
        }

        let caps = self.compiler.captures(line)?;
        let (block, next_index) = Self::collect(lines, index, |l| {
            l.starts_with(char::is_whitespace) || l.starts_with("-->")
        });
        Some(Extraction {
            error: block.into_error(timestamp, "error", &caps[1]),
            next_index,
        })
    }
}
