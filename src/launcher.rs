//! Session launcher: wrap a command, capture its output, keep metadata live.

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use tokio::process::{Child, Command};
use tokio::sync::watch;

use crate::config::Config;
use crate::error::SiphonError;
use crate::monitor::LogMonitor;
use crate::session::{read_meta, session_name, write_meta, SessionPaths, SessionRecord};

/// Exit code reported when the child's own code is unavailable
pub const FALLBACK_EXIT_CODE: i32 = 1;

static NEEDS_QUOTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["\s;|&$`\\]"#).expect("valid quoting pattern"));

/// Quote one argument for a POSIX shell command line
pub fn quote_shell_arg(arg: &str) -> String {
    if NEEDS_QUOTING.is_match(arg) {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// Shell script that runs the command with stderr merged and output teed to the log
pub fn wrapped_command_line(args: &[String], log_path: &Path, shell_has_pipefail: bool) -> String {
    let command = args
        .iter()
        .map(|arg| quote_shell_arg(arg))
        .collect::<Vec<_>>()
        .join(" ");
    // Without pipefail the pipeline reports tee's status instead of the command's.
    let pipefail = if shell_has_pipefail {
        "set -o pipefail;"
    } else {
        "(set -o pipefail) 2>/dev/null && set -o pipefail;"
    };
    format!("{pipefail} ({command}) 2>&1 | tee \"{}\"", log_path.display())
}

/// `bash` when available, since some `sh` implementations reject pipefail
fn pick_shell() -> (PathBuf, bool) {
    let bash = env::var_os("PATH").and_then(|path| {
        env::split_paths(&path)
            .map(|dir| dir.join("bash"))
            .find(|candidate| candidate.is_file())
    });
    match bash {
        Some(bash) => (bash, true),
        None => (PathBuf::from("sh"), false),
    }
}

/// Wrap `args` in a session rooted at the current directory.
///
/// Returns the exit code the host process should exit with.
pub async fn run_command(args: &[String], name_override: Option<&str>, config: &Config) -> Result<i32> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    run_command_in(&cwd, args, name_override, config).await
}

/// Same as [`run_command`] with an explicit working directory
pub async fn run_command_in(
    cwd: &Path,
    args: &[String],
    name_override: Option<&str>,
    config: &Config,
) -> Result<i32> {
    if args.is_empty() {
        return Err(SiphonError::NoCommand.into());
    }

    let session_dir = config.ensure_session_dir()?;
    let name = match name_override {
        Some(name) => name.to_string(),
        None => session_name(cwd, args),
    };
    let paths = SessionPaths::new(&session_dir, &name);
    let command_text = args.join(" ");

    let mut record = SessionRecord::new(&name, &command_text, cwd.display().to_string(), Utc::now());
    write_meta(&paths.meta_path, &record)
        .with_context(|| format!("Failed to write {}", paths.meta_path.display()))?;

    eprintln!("{} Session: {}", "[siphon]".cyan().bold(), name.bold());
    eprintln!("{} Logging to {}", "[siphon]".cyan().bold(), paths.log_path.display());

    let (shell, has_pipefail) = pick_shell();
    let mut child = Command::new(&shell)
        .arg("-c")
        .arg(wrapped_command_line(args, &paths.log_path, has_pipefail))
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| SiphonError::Spawn {
            command: command_text.clone(),
            source,
        })?;

    record.pid = child.id().unwrap_or(0);
    write_meta(&paths.meta_path, &record)
        .with_context(|| format!("Failed to write {}", paths.meta_path.display()))?;
    tracing::debug!(session = %name, pid = record.pid, shell = %shell.display(), "wrapped command started");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = LogMonitor::new(paths.clone(), record.clone(), config.log)
        .spawn(config.monitor.interval(), shutdown_rx);

    let status = wait_forwarding_signals(&mut child).await;
    let exit_code = settle_exit_code(&mut child, status).await;

    // Stop and join the monitor before the final pass.
    let _ = shutdown_tx.send(true);
    let monitor = match monitor.await {
        Ok(monitor) => monitor,
        Err(err) => {
            tracing::warn!(error = %err, "log monitor task failed");
            let latest = read_meta(&paths.meta_path).unwrap_or(record);
            LogMonitor::new(paths, latest, config.log)
        }
    };

    let record = monitor.finish(exit_code);
    tracing::debug!(
        session = %record.session,
        exit_code,
        errors = record.error_count,
        "session finished"
    );

    Ok(exit_code)
}

/// Exit code for the session. If the wait failed the child is killed and
/// reaped first, so an exited record never describes a live process.
async fn settle_exit_code(child: &mut Child, status: Result<ExitStatus>) -> i32 {
    match status {
        Ok(status) => status.code().unwrap_or(FALLBACK_EXIT_CODE),
        Err(err) => {
            tracing::warn!(error = %err, "lost track of wrapped command, stopping it");
            if let Err(err) = child.kill().await {
                tracing::debug!(error = %err, "could not stop wrapped command");
            }
            FALLBACK_EXIT_CODE
        }
    }
}

/// Wait for the child, forwarding SIGINT and SIGTERM to it meanwhile.
///
/// Without signal handlers the child is still awaited; the terminal delivers
/// Ctrl-C to the whole foreground group anyway.
#[cfg(unix)]
async fn wait_forwarding_signals(child: &mut Child) -> Result<ExitStatus> {
    use tokio::signal::unix::{signal, SignalKind};

    let handlers = signal(SignalKind::interrupt())
        .and_then(|interrupt| Ok((interrupt, signal(SignalKind::terminate())?)));
    let (mut interrupt, mut terminate) = match handlers {
        Ok(handlers) => handlers,
        Err(err) => {
            tracing::warn!(error = %err, "signal forwarding unavailable");
            return child.wait().await.context("Failed to wait for wrapped command");
        }
    };
    let pid = child.id();

    loop {
        tokio::select! {
            status = child.wait() => {
                return status.context("Failed to wait for wrapped command");
            }
            _ = interrupt.recv() => forward_signal(pid, libc::SIGINT),
            _ = terminate.recv() => forward_signal(pid, libc::SIGTERM),
        }
    }
}

#[cfg(not(unix))]
async fn wait_forwarding_signals(child: &mut Child) -> Result<ExitStatus> {
    child.wait().await.context("Failed to wait for wrapped command")
}

#[cfg(unix)]
fn forward_signal(pid: Option<u32>, signal: libc::c_int) {
    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    tracing::debug!(pid, signal, "forwarding signal to wrapped command");
    unsafe {
        libc::kill(pid, signal);
    }
}
