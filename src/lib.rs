//! Siphon - runtime context capture for dev processes
//!
//! This library wraps a command, tees its merged output into a capped
//! per-session log, keeps a live metadata record next to it, and answers
//! status and output queries with errors extracted from the log tail.

pub mod classify;
pub mod cli;
pub mod config;
pub mod dev;
pub mod error;
pub mod extract;
pub mod hint;
pub mod launcher;
pub mod log_file;
pub mod logging;
pub mod monitor;
pub mod output;
pub mod session;

// Re-export commonly used types
pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::SiphonError;
pub use extract::{extract_errors, Dialect, ErrorExtractor, ErrorExtractorRegistry, ParsedError};
pub use hint::generate_hint;
pub use session::{SessionEntry, SessionRecord, SessionStatus};
