//! Typed failures surfaced by the library layer.

use std::io;
use std::path::PathBuf;

/// Error types for session and launcher operations
#[derive(Debug, thiserror::Error)]
pub enum SiphonError {
    #[error("No command specified after --")]
    NoCommand,

    #[error("Could not determine home directory for the session store")]
    NoHomeDir,

    #[error("Failed to create session directory {path}: {source}")]
    SessionDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Session '{query}' not found.\n\nAvailable sessions:\n  {}", available.join("\n  "))]
    SessionNotFound {
        query: String,
        available: Vec<String>,
    },

    #[error("Multiple sessions match '{query}'. Please be more specific:\n  {}", matches.join("\n  "))]
    AmbiguousSession { query: String, matches: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_available_sessions() {
        let err = SiphonError::SessionNotFound {
            query: "web".to_string(),
            available: vec!["api:dev".to_string(), "worker:start".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Session 'web' not found.\n\nAvailable sessions:\n  api:dev\n  worker:start"
        );
    }

    #[test]
    fn test_ambiguous_lists_matches() {
        let err = SiphonError::AmbiguousSession {
            query: "app".to_string(),
            matches: vec!["app:dev".to_string(), "app:test".to_string()],
        };
        assert!(err.to_string().contains("Please be more specific"));
        assert!(err.to_string().ends_with("app:dev\n  app:test"));
    }
}
