//! Command-line interface definitions for the `siphon` tool.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Wrap a dev command and keep its runtime context queryable
#[derive(Parser, Debug)]
#[command(
    name = "siphon",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SIPHON_GIT_SHA"), ")"),
    about,
    long_about = None
)]
#[command(
    after_help = "EXAMPLES:\n    siphon -- npm run dev\n    siphon --name api -- cargo run\n    siphon dev\n    siphon status\n    siphon output web:dev --grep error"
)]
pub struct Cli {
    /// Command to wrap (everything after `--`)
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    pub command: Vec<String>,

    /// Session name to use instead of the derived `<dir>:<command>` name
    #[arg(long, short = 'n', value_name = "NAME")]
    pub name: Option<String>,

    /// Generate shell completions
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,

    /// Output default configuration to stdout
    #[arg(long)]
    pub print_config: bool,

    #[command(subcommand)]
    pub subcommand: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Detect the project's dev command and run it under siphon
    Dev,
    /// List captured sessions
    List,
    /// Delete old session logs and metadata
    Clean {
        /// Remove files older than this many days
        #[arg(long, default_value = "7", value_name = "DAYS")]
        days: u64,

        /// Remove every session file regardless of age
        #[arg(long)]
        all: bool,
    },
    /// Show session health, recent errors, and a next-step hint
    Status {
        /// Session to report on (exact, prefix, or substring match)
        #[arg(value_name = "SESSION")]
        session: Option<String>,
    },
    /// Print the raw tail of a session's log
    Output {
        /// Session name (e.g. `my-app:dev`)
        #[arg(value_name = "SESSION")]
        name: String,

        /// Number of lines to show (default from config: 100)
        #[arg(long, short = 'l', value_name = "N")]
        lines: Option<usize>,

        /// Only show lines containing this text (case-insensitive)
        #[arg(long, short = 'g', value_name = "TEXT")]
        grep: Option<String>,
    },
}
