use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::env;
use std::io;
use std::path::Path;

use siphon::cli::{Cli, Commands};
use siphon::config::{print_default_config, Config};
use siphon::dev::run_dev;
use siphon::error::SiphonError;
use siphon::launcher::run_command;
use siphon::output::{
    print_session_list, print_status_report, render_output, render_status_report, NO_SESSIONS_MESSAGE,
};
use siphon::session::registry::{clean_sessions, find_session, fuzzy_match_sessions, CleanOptions};
use siphon::session::{get_all_sessions, list_sessions, SessionEntry};

fn format_error(message: &str, tip: Option<&str>) -> String {
    let mut output = format!("{} {}", "Error:".red().bold(), message);
    if let Some(tip) = tip {
        output.push('\n');
        output.push_str(&format!("{} {}", "Tip:".blue().bold(), tip));
    }
    output
}

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "siphon", &mut io::stdout());
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn status(session_dir: &Path, query: Option<&str>, config: &Config) -> Result<i32> {
    let sessions = get_all_sessions(session_dir);
    if sessions.is_empty() {
        println!("{NO_SESSIONS_MESSAGE}");
        return Ok(0);
    }

    let selected: Vec<&SessionEntry> = match query {
        Some(query) => fuzzy_match_sessions(&sessions, query),
        None => sessions.iter().collect(),
    };
    if let Some(query) = query.filter(|_| selected.is_empty()) {
        return Err(SiphonError::SessionNotFound {
            query: query.to_string(),
            available: sessions.iter().map(|e| e.record.session.clone()).collect(),
        }
        .into());
    }

    let report = render_status_report(&selected, &config.query, Utc::now());
    print_status_report(&report);
    Ok(0)
}

fn output(session_dir: &Path, name: &str, lines: Option<usize>, grep: Option<&str>, config: &Config) -> Result<i32> {
    let sessions = get_all_sessions(session_dir);
    if sessions.is_empty() {
        println!("{NO_SESSIONS_MESSAGE}");
        return Ok(0);
    }
    let entry = find_session(&sessions, name)?;
    let lines = lines.unwrap_or(config.query.output_tail_lines);
    println!("{}", render_output(entry, lines, grep));
    Ok(0)
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = Config::load();
    config.apply_env_overrides();

    match cli.subcommand {
        Some(Commands::Dev) => {
            let cwd = env::current_dir().context("Failed to read current directory")?;
            runtime()?.block_on(run_dev(&cwd, &config))
        }
        Some(Commands::List) => {
            let rows = list_sessions(&config.session_dir()?);
            if rows.is_empty() {
                println!("{NO_SESSIONS_MESSAGE}");
            } else {
                print_session_list(&rows);
            }
            Ok(0)
        }
        Some(Commands::Clean { days, all }) => {
            let session_dir = config.session_dir()?;
            let removed = clean_sessions(&session_dir, CleanOptions { days, all })
                .with_context(|| format!("Failed to clean {}", session_dir.display()))?;
            let plural = if removed == 1 { "" } else { "s" };
            println!("Removed {removed} file{plural} from {}", session_dir.display());
            Ok(0)
        }
        Some(Commands::Status { session }) => status(&config.session_dir()?, session.as_deref(), &config),
        Some(Commands::Output { name, lines, grep }) => {
            output(&config.session_dir()?, &name, lines, grep.as_deref(), &config)
        }
        None if cli.command.is_empty() => {
            Cli::command().print_help()?;
            println!();
            Ok(0)
        }
        None => runtime()?.block_on(run_command(&cli.command, cli.name.as_deref(), &config)),
    }
}

fn main() {
    let cli = Cli::parse();
    siphon::logging::init();

    if let Some(shell) = cli.completions {
        print_completions(shell);
        return;
    }

    if cli.print_config {
        print_default_config();
        return;
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            let tip = match err.downcast_ref::<SiphonError>() {
                Some(SiphonError::NoCommand) => Some("siphon -- npm run dev"),
                Some(SiphonError::SessionNotFound { .. }) => Some("siphon list"),
                _ => None,
            };
            eprintln!("{}", format_error(&format!("{err:#}"), tip));
            1
        }
    };
    std::process::exit(code);
}
