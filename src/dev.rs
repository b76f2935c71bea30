//! `siphon dev`: pick the project's dev command and wrap it.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::config::Config;
use crate::launcher::run_command_in;

/// Lockfiles that identify a package manager, checked in order
const PACKAGE_MANAGER_LOCKFILES: &[(&str, &[&str])] = &[
    ("bun", &["bun.lockb", "bun.lock"]),
    ("pnpm", &["pnpm-lock.yaml"]),
    ("yarn", &["yarn.lock"]),
];

/// `package.json` scripts treated as a dev entry point, in priority order
const DEV_SCRIPT_CANDIDATES: [&str; 3] = ["dev", "start", "serve"];

struct FallbackRunner {
    marker_file: &'static str,
    message: &'static str,
    command: &'static [&'static str],
}

static FALLBACK_RUNNERS: [FallbackRunner; 3] = [
    FallbackRunner {
        marker_file: "Cargo.toml",
        message: "[siphon] Detected Cargo project, running: cargo run",
        command: &["cargo", "run"],
    },
    FallbackRunner {
        marker_file: "go.mod",
        message: "[siphon] Detected Go project, running: go run .",
        command: &["go", "run", "."],
    },
    FallbackRunner {
        marker_file: "manage.py",
        message: "[siphon] Detected Django project, running: python manage.py runserver",
        command: &["python", "manage.py", "runserver"],
    },
];

const PYTHON_PROJECT_MARKER: &str = "pyproject.toml";

pub const PYTHON_MANUAL_RUN_HINT: &str = "[siphon] Detected Python project. Unable to determine run command.\n\
Try: siphon -- python <your-script>.py";

pub const NO_DEV_COMMAND_HINT: &str = "[siphon] No dev command detected.\n\
Try adding a 'dev' script to package.json, or use:\n  siphon -- <your command>";

#[derive(Debug, Deserialize, Default)]
struct PackageJson {
    #[serde(default)]
    scripts: HashMap<String, serde_json::Value>,
}

/// A `package.json` script and the package manager to run it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevScript {
    pub package_manager: &'static str,
    pub script: String,
}

/// What `siphon dev` decided to do in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevPlan {
    Run {
        command: Vec<String>,
        announcement: String,
    },
    Unresolved {
        hint: &'static str,
    },
}

/// Package manager chosen by lockfile, defaulting to npm
pub fn detect_package_manager(cwd: &Path) -> &'static str {
    PACKAGE_MANAGER_LOCKFILES
        .iter()
        .find(|(_, files)| files.iter().any(|file| cwd.join(file).exists()))
        .map(|(pm, _)| *pm)
        .unwrap_or("npm")
}

/// First non-empty dev-like script in `package.json`
pub fn detect_dev_script(cwd: &Path) -> Option<DevScript> {
    let contents = std::fs::read_to_string(cwd.join("package.json")).ok()?;
    let package: PackageJson = match serde_json::from_str(&contents) {
        Ok(package) => package,
        Err(err) => {
            tracing::debug!(error = %err, "ignoring unparseable package.json");
            return None;
        }
    };

    let script = DEV_SCRIPT_CANDIDATES.iter().find(|name| {
        package
            .scripts
            .get(**name)
            .and_then(|value| value.as_str())
            .is_some_and(|body| !body.is_empty())
    })?;

    Some(DevScript {
        package_manager: detect_package_manager(cwd),
        script: script.to_string(),
    })
}

pub fn plan_dev_command(cwd: &Path) -> DevPlan {
    if let Some(DevScript {
        package_manager,
        script,
    }) = detect_dev_script(cwd)
    {
        return DevPlan::Run {
            announcement: format!("[siphon] Running: {package_manager} run {script}"),
            command: vec![package_manager.to_string(), "run".to_string(), script],
        };
    }

    if let Some(runner) = FALLBACK_RUNNERS
        .iter()
        .find(|runner| cwd.join(runner.marker_file).exists())
    {
        return DevPlan::Run {
            command: runner.command.iter().map(|s| s.to_string()).collect(),
            announcement: runner.message.to_string(),
        };
    }

    let hint = if cwd.join(PYTHON_PROJECT_MARKER).exists() {
        PYTHON_MANUAL_RUN_HINT
    } else {
        NO_DEV_COMMAND_HINT
    };
    DevPlan::Unresolved { hint }
}

/// Detect and wrap the dev command for `cwd`; exit code 1 when none is found
pub async fn run_dev(cwd: &Path, config: &Config) -> Result<i32> {
    match plan_dev_command(cwd) {
        DevPlan::Run {
            command,
            announcement,
        } => {
            eprintln!("{announcement}");
            run_command_in(cwd, &command, None, config).await
        }
        DevPlan::Unresolved { hint } => {
            eprintln!("{hint}");
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_package_manager_from_lockfile() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_package_manager(dir.path()), "npm");

        touch(&dir, "yarn.lock", "");
        assert_eq!(detect_package_manager(dir.path()), "yarn");

        touch(&dir, "bun.lock", "");
        assert_eq!(detect_package_manager(dir.path()), "bun");
    }

    #[test]
    fn test_dev_script_priority() {
        let dir = TempDir::new().unwrap();
        touch(
            &dir,
            "package.json",
            r#"{"scripts": {"start": "node server.js", "dev": "vite", "serve": "x"}}"#,
        );
        touch(&dir, "pnpm-lock.yaml", "");

        assert_eq!(
            detect_dev_script(dir.path()),
            Some(DevScript {
                package_manager: "pnpm",
                script: "dev".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_script_is_skipped() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "package.json", r#"{"scripts": {"dev": "", "serve": "http-server"}}"#);
        assert_eq!(detect_dev_script(dir.path()).unwrap().script, "serve");
    }

    #[test]
    fn test_invalid_package_json_is_ignored() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "package.json", "{ nope");
        touch(&dir, "go.mod", "module x");

        assert!(detect_dev_script(dir.path()).is_none());
        assert_eq!(
            plan_dev_command(dir.path()),
            DevPlan::Run {
                command: vec!["go".into(), "run".into(), ".".into()],
                announcement: "[siphon] Detected Go project, running: go run .".into(),
            }
        );
    }

    #[test]
    fn test_package_script_plan() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "package.json", r#"{"scripts": {"start": "node ."}}"#);
        touch(&dir, "Cargo.toml", "[package]");

        match plan_dev_command(dir.path()) {
            DevPlan::Run {
                command,
                announcement,
            } => {
                assert_eq!(command, vec!["npm", "run", "start"]);
                assert_eq!(announcement, "[siphon] Running: npm run start");
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn test_python_and_empty_directories_are_unresolved() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            plan_dev_command(dir.path()),
            DevPlan::Unresolved {
                hint: NO_DEV_COMMAND_HINT
            }
        );

        touch(&dir, "pyproject.toml", "[project]");
        assert_eq!(
            plan_dev_command(dir.path()),
            DevPlan::Unresolved {
                hint: PYTHON_MANUAL_RUN_HINT
            }
        );
    }

    #[tokio::test]
    async fn test_run_dev_without_command_exits_one() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            session_dir: Some(dir.path().join("sessions")),
            ..Config::default()
        };
        assert_eq!(run_dev(dir.path(), &config).await.unwrap(), 1);
    }
}
