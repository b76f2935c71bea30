use std::process::Command;

/// Run a git command and return trimmed stdout when it succeeds.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    let version = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(sha) => {
            let clean = Command::new("git")
                .args(["diff", "--quiet"])
                .status()
                .map(|status| status.success())
                .unwrap_or(true);
            if clean {
                sha
            } else {
                format!("{sha}-dirty")
            }
        }
        None => "unknown".to_string(),
    };

    println!("cargo:rustc-env=SIPHON_GIT_SHA={version}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}
