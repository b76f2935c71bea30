//! Stable session names derived from the working directory and command.

use std::path::Path;

const PACKAGE_RUNNERS: [&str; 4] = ["npm", "bun", "yarn", "pnpm"];

/// Build a session name such as `my-app:dev` from cwd + command intent
pub fn session_name(cwd: &Path, args: &[String]) -> String {
    let dir_name = cwd
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}:{}", dir_name, extract_command_shortname(args))
}

/// Normalize a command into a human-readable short label
pub fn extract_command_shortname(args: &[String]) -> String {
    let Some((cmd, rest)) = args.split_first() else {
        return "session".to_string();
    };

    if PACKAGE_RUNNERS.contains(&cmd.as_str()) {
        if rest.first().map(String::as_str) == Some("run") {
            if let Some(script) = rest.get(1).filter(|s| !s.is_empty()) {
                return script.clone();
            }
        }
        if let Some(first) = rest.first().filter(|s| !s.is_empty() && !s.starts_with('-')) {
            return first.clone();
        }
    }

    if cmd == "python" || cmd == "python3" {
        if let Some(stem) = rest
            .first()
            .and_then(|file| file.strip_suffix(".py"))
            .and_then(base_name)
        {
            return stem;
        }
    }

    if cmd == "node" {
        if let Some(file) = rest.first() {
            for ext in [".js", ".ts", ".mjs", ".mts"] {
                if let Some(stem) = file.strip_suffix(ext).and_then(base_name) {
                    return stem;
                }
            }
        }
    }

    if cmd == "cargo" || cmd == "go" {
        if let Some(sub) = rest.first().filter(|s| !s.is_empty()) {
            return sub.clone();
        }
    }

    match args.last().filter(|s| !s.is_empty()) {
        Some(last) => base_name(strip_extension(last)).unwrap_or_else(|| "session".to_string()),
        None => "session".to_string(),
    }
}

/// Drop the final `.ext` of the last path component (`foo.tar.gz` -> `foo.tar`)
fn strip_extension(arg: &str) -> &str {
    match arg.rfind('.') {
        Some(dot) if !arg[dot + 1..].is_empty() && !arg[dot + 1..].contains('/') => &arg[..dot],
        _ => arg,
    }
}

fn base_name(path: &str) -> Option<String> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
