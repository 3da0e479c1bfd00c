//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Configuration file to load
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// doctrace - keeps a repository changelog up to date from webhook events
#[derive(Parser, Debug)]
#[command(name = "doctrace")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: $DOCTRACE_CONFIG, ./doctrace.toml, user config)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run as if doctrace was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the webhook server
    #[command(
        long_about = "Run the webhook server.\n\n\
            Listens for GitHub deliveries on POST /webhook. Pushes to the integration \
            branch produce a changelog pull request; merging that pull request releases \
            the Unreleased section.\n\n\
            Requires GITHUB_WEBHOOK_SECRET. GITHUB_TOKEN is used for pushes and the \
            GitHub API, GROQ_API_KEY for the entry generator.",
        after_help = "\
EXAMPLES:
    # Serve on the configured address (default 0.0.0.0:8000)
    doctrace serve

    # Serve a specific checkout on another port
    doctrace --cwd /srv/app serve --bind 127.0.0.1:9000"
    )]
    Serve {
        /// Address to listen on (overrides [server] bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Insert an entry under the Unreleased section of a changelog file
    #[command(after_help = "\
EXAMPLES:
    # Insert from a file
    doctrace insert --entry-file entry.md

    # Insert from stdin
    echo '- **src/lib.rs**: add parser' | doctrace insert")]
    Insert {
        /// Changelog file (default: [repository] changelog_path)
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Read the entry from this file instead of stdin
        #[arg(long, value_name = "PATH")]
        entry_file: Option<PathBuf>,
    },

    /// Stamp the Unreleased section of a changelog file with a date
    Release {
        /// Changelog file (default: [repository] changelog_path)
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Release date, YYYY-MM-DD (default: today)
        #[arg(long, value_name = "DATE")]
        date: Option<chrono::NaiveDate>,
    },

    /// Print the diff between two revisions
    Diff {
        /// Old revision
        old: String,
        /// New revision
        new: String,

        /// Only list changed files
        #[arg(long)]
        name_only: bool,
    },

    /// Generate a changelog entry for the diff between two revisions
    Entry {
        /// Old revision
        old: String,
        /// New revision
        new: String,

        /// Insert the entry into the changelog file instead of printing it
        #[arg(long)]
        apply: bool,

        /// Changelog file used with --apply
        #[arg(long, value_name = "PATH", requires = "apply")]
        file: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    #[command(after_help = "\
EXAMPLES:
    doctrace completion bash > ~/.local/share/bash-completion/completions/doctrace
    doctrace completion zsh > ~/.zfunc/_doctrace")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
