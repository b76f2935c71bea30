//! Stack-frame shapes shared by extractors that collect trailing frames.

use regex::Regex;

/// Line shapes that count as a continuation of a stack trace
#[derive(Debug, Clone)]
pub struct StackFrameShapes {
    shapes: Vec<Regex>,
}

impl StackFrameShapes {
    pub fn builtin() -> Self {
        let shapes = [
            // Node: `at fn (file:line:col)`
            r"^\s+at\s+.+\(.+:\d+:\d+\)$",
            r"^\s+at\s+.+\s+\(.+:\d+:\d+\)$",
            // Node: `at file:line:col`
            r"^\s+at\s+.+:\d+:\d+$",
            // Python traceback frame
            r#"^\s+File ".+", line \d+"#,
            // Go goroutine header and source location
            r"^goroutine \d+ \[.+\]:$",
            r"^\s+.+\.go:\d+",
            r"^\s+at .+",
        ];
        Self {
            shapes: shapes
                .iter()
                .map(|p| Regex::new(p).expect("built-in stack frame pattern must compile"))
                .collect(),
        }
    }

    pub fn is_stack_frame(&self, line: &str) -> bool {
        self.shapes.iter().any(|shape| shape.is_match(line))
    }

    /// Collect consecutive frame lines after `lines[index]`.
    /// Returns the frames and the index of the first non-frame line.
    pub(crate) fn collect_after(&self, lines: &[&str], index: usize) -> (super::Block, usize) {
        let mut block = super::Block::starting_with(lines[index]);
        let mut next = index + 1;
        while next < lines.len() && self.is_stack_frame(lines[next]) {
            block.push_frame(lines[next]);
            next += 1;
        }
        (block, next)
    }
}

impl Default for StackFrameShapes {
    fn default() -> Self {
        Self::builtin()
    }
}
