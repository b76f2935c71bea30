//! Go panics and fatal runtime errors.

use regex::Regex;

use super::{Block, Dialect, ErrorExtractor, Extraction, ParsedError};

pub struct GoExtractor {
    panic: Regex,
    fatal: Regex,
    goroutine: Regex,
    source_location: Regex,
}

impl GoExtractor {
    pub fn new() -> Self {
        Self {
            panic: Regex::new(r"^panic: (.+)$").expect("valid panic pattern"),
            fatal: Regex::new(r"^fatal error: (.+)$").expect("valid fatal pattern"),
            goroutine: Regex::new(r"^goroutine \d+ \[.+\]:$").expect("valid goroutine pattern"),
            source_location: Regex::new(r"\.go:\d+").expect("valid source location pattern"),
        }
    }

    /// Whether a line continues a panic trace.
    ///
    /// Go prints each frame as an unindented call (`main.main()`) followed by
    /// an indented `file.go:line`, so calls are accepted alongside locations.
    fn is_trace_line(&self, line: &str) -> bool {
        self.goroutine.is_match(line)
            || line.starts_with(char::is_whitespace)
            || self.source_location.is_match(line)
            || is_call_frame(line)
            || line.starts_with("created by ")
    }
}

/// `pkg.func(args)` with no whitespace before the argument list
fn is_call_frame(line: &str) -> bool {
    let Some(paren) = line.find('(') else {
        return false;
    };
    paren > 0 && line.ends_with(')') && !line[..paren].contains(char::is_whitespace)
}

impl Default for GoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorExtractor for GoExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::Go
    }

    fn extract(&self, lines: &[&str], index: usize, timestamp: Option<&str>) -> Option<Extraction> {
        let line = lines[index];

        if let Some(caps) = self.panic.captures(line) {
            let mut block = Block::starting_with(line);
            let mut next = index + 1;
            while next < lines.len() && self.is_trace_line(lines[next]) {
                block.push_frame(lines[next]);
                next += 1;
            }
            return Some(Extraction {
                error: block.into_error(timestamp, "panic", &caps[1]),
                next_index: next,
            });
        }

        self.fatal.captures(line).map(|caps| Extraction {
            error: ParsedError::single_line(timestamp, "fatal error", &caps[1], line),
            next_index: index + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Option<Extraction> {
        let lines: Vec<&str> = text.split('\n').collect();
        GoExtractor::new().extract(&lines, 0, None)
    }

    #[test]
    fn test_panic_with_goroutine_trace() {
        let result = extract("panic: nil pointer\ngoroutine 1 [running]:\nmain.main()\n\t/app/main.go:10").unwrap();
        assert_eq!(result.error.error_type, "panic");
        assert_eq!(result.error.message, "nil pointer");
        assert_eq!(
            result.error.stack,
            vec![
                "goroutine 1 [running]:".to_string(),
                "main.main()".to_string(),
                "/app/main.go:10".to_string(),
            ]
        );
        assert_eq!(result.next_index, 4);
    }

    #[test]
    fn test_panic_trace_stops_at_blank_line() {
        let text = "panic: boom\n\ngoroutine 1 [running]:";
        let result = extract(text).unwrap();
        assert!(result.error.stack.is_empty());
        assert_eq!(result.next_index, 1);
    }

    #[test]
    fn test_method_frames_and_created_by() {
        let text = "\
panic: runtime error: index out of range [3] with length 2
goroutine 6 [running]:
main.(*Worker).run(0xc000010000, {0x0, 0x0})
\t/app/worker.go:42 +0x1d
created by main.start in goroutine 1
\t/app/main.go:17 +0x25
exit status 2";
        let result = extract(text).unwrap();
        assert_eq!(result.error.stack.len(), 5);
        assert_eq!(result.next_index, 6);
    }

    #[test]
    fn test_fatal_error() {
        let result = extract("fatal error: all goroutines are asleep - deadlock!").unwrap();
        assert_eq!(result.error.error_type, "fatal error");
        assert_eq!(result.error.message, "all goroutines are asleep - deadlock!");
        assert_eq!(result.next_index, 1);
    }

    #[test]
    fn test_call_frame_shape() {
        assert!(is_call_frame("main.main()"));
        assert!(is_call_frame("net/http.(*conn).serve(0xc0001, {0x7, 0x8})"));
        assert!(!is_call_frame("GET /users (200)"));
        assert!(!is_call_frame("()"));
    }
}
