//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves paths and settings from the [`Context`]
//! 2. Calls into core, git or the engine
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! `serve` and `entry` talk to the network and run on a tokio runtime
//! created by the handler; everything else is synchronous.

mod completion;
mod diff;
mod entry;
mod insert;
mod release;
mod serve;

pub use completion::completion;
pub use diff::diff;
pub use entry::entry;
pub use insert::insert;
pub use release::release;
pub use serve::serve;

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::cli::args::Command;
use crate::cli::Context;
use crate::engine::{Pipeline, PipelineSettings};
use crate::forge::github::GitHubForge;
use crate::generator::{ChatCompletionsGenerator, EntryGenerator};
use crate::git::Git;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Serve { bind } => serve::serve(ctx, bind.as_deref()),
        Command::Insert { file, entry_file } => {
            insert::insert(ctx, file.as_deref(), entry_file.as_deref())
        }
        Command::Release { file, date } => release::release(ctx, file.as_deref(), date),
        Command::Diff {
            old,
            new,
            name_only,
        } => diff::diff(ctx, &old, &new, name_only),
        Command::Entry {
            old,
            new,
            apply,
            file,
        } => entry::entry(ctx, &old, &new, apply, file.as_deref()),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// The production entry generator from configuration.
pub(crate) fn build_generator(ctx: &Context) -> Result<Arc<dyn EntryGenerator>> {
    let config = &ctx.config;
    if ctx.secrets.generator_api_key.is_none() {
        tracing::warn!(
            "{} is not set; the entry generator will likely refuse requests",
            crate::core::config::Secrets::GENERATOR_KEY_ENV
        );
    }
    let generator = ChatCompletionsGenerator::new(
        config.generator_api_base(),
        config.generator_model(),
        ctx.secrets.generator_api_key.clone(),
        config.generator_timeout(),
        config.max_diff_chars(),
    )?;
    Ok(Arc::new(generator))
}

/// The production pipeline: chat-completions generator and GitHub forge.
///
/// The GitHub repository comes from `[forge] owner/repo`, or else from the
/// URL of the configured remote.
pub(crate) fn build_pipeline(ctx: &Context) -> Result<Pipeline> {
    let config = &ctx.config;
    let repo_path = ctx.repo_path();

    let (owner, repo) = match config.forge_repo() {
        Some((owner, repo)) => (owner.to_string(), repo.to_string()),
        None => {
            let git = Git::open(&repo_path)?;
            git.remote_url(config.remote())?
                .as_deref()
                .and_then(Git::parse_github_remote)
                .ok_or_else(|| {
                    anyhow!(
                        "cannot determine the GitHub repository from remote '{}'; \
                         set [forge] owner and repo",
                        config.remote()
                    )
                })?
        }
    };

    let forge = GitHubForge::with_api_base(
        ctx.secrets.github_token.clone(),
        owner,
        repo,
        config.forge_api_base(),
        config.forge_timeout(),
    )?;
    let settings = PipelineSettings::from_config(config, &ctx.secrets, repo_path);
    Ok(Pipeline::new(settings, build_generator(ctx)?, Arc::new(forge)))
}
