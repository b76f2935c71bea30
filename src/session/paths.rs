use std::path::{Path, PathBuf};

pub const LOG_SUFFIX: &str = ".log";
pub const META_SUFFIX: &str = ".meta.json";

/// Log and metadata locations for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub log_path: PathBuf,
    pub meta_path: PathBuf,
}

impl SessionPaths {
    /// Resolve file paths for a session name inside the session directory
    pub fn new(session_dir: &Path, session_name: &str) -> Self {
        let safe_name = file_safe_name(session_name);
        Self {
            log_path: session_dir.join(format!("{safe_name}{LOG_SUFFIX}")),
            meta_path: session_dir.join(format!("{safe_name}{META_SUFFIX}")),
        }
    }

    /// Log path that sits next to a metadata file
    pub fn log_path_for_meta(meta_path: &Path) -> PathBuf {
        let file_name = meta_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = file_name.strip_suffix(META_SUFFIX).unwrap_or(&file_name);
        meta_path.with_file_name(format!("{stem}{LOG_SUFFIX}"))
    }
}

/// Keep every session file directly inside the session directory
fn file_safe_name(session_name: &str) -> String {
    let flat = session_name.replace(['/', '\\'], "_");
    if cfg!(windows) {
        flat.replace(':', "--")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_session_stem() {
        let paths = SessionPaths::new(Path::new("/tmp/siphon"), "web");
        assert_eq!(paths.log_path, PathBuf::from("/tmp/siphon/web.log"));
        assert_eq!(paths.meta_path, PathBuf::from("/tmp/siphon/web.meta.json"));
    }

    #[test]
    fn test_log_path_for_meta() {
        let meta = Path::new("/tmp/siphon/api.dev.meta.json");
        assert_eq!(
            SessionPaths::log_path_for_meta(meta),
            PathBuf::from("/tmp/siphon/api.dev.log")
        );
    }

    #[test]
    fn test_separators_stay_inside_session_dir() {
        let dir = Path::new("/tmp/siphon");
        let paths = SessionPaths::new(dir, "../../etc/web");
        assert_eq!(paths.log_path.parent(), Some(dir));
        assert_eq!(paths.meta_path.parent(), Some(dir));
        assert_eq!(paths.log_path, PathBuf::from("/tmp/siphon/.._.._etc_web.log"));

        let paths = SessionPaths::new(dir, r"api\dev");
        assert_eq!(paths.meta_path.parent(), Some(dir));
    }
}
