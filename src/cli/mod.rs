//! cli
//!
//! Command-line interface layer for doctrace.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and secrets once, into a [`Context`]
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Changelog edits go through
//! `core::ops::edit_file`, repository work through [`crate::git`] and
//! [`crate::engine`], and `serve` hands off to [`crate::server`].

pub mod args;
pub mod commands;

pub use args::{Cli, Command, Shell};

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::core::config::{Config, Secrets};

/// Everything a command handler needs from the invocation.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub secrets: Secrets,
    /// Working directory after `--cwd`.
    pub cwd: PathBuf,
    pub debug: bool,
}

impl Context {
    /// Repository the commands operate on: `[repository] path`, resolved
    /// against the working directory, or the working directory itself.
    pub fn repo_path(&self) -> PathBuf {
        match self.config.repository_path() {
            Some(path) => self.resolve(path),
            None => self.cwd.clone(),
        }
    }

    /// Changelog file: `explicit`, or the configured path inside the repository.
    pub fn changelog_file(&self, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => self.resolve(path),
            None => self.repo_path().join(self.config.changelog_path()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let cwd = match &cli.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("cannot determine working directory")?,
    };
    let explicit = cli.config.as_deref().map(|p| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            cwd.join(p)
        }
    });
    let config = Config::load(explicit.as_deref())?;
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "loaded configuration");
    }

    let ctx = Context {
        config,
        secrets: Secrets::from_env(),
        cwd,
        debug: cli.debug,
    };

    commands::dispatch(cli.command, &ctx)
}
