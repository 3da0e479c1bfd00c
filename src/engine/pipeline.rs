//! engine::pipeline
//!
//! Turns dispatcher actions into repository changes.
//!
//! # Entry flow
//!
//! ```text
//! lock -> fetch -> diff(before, after) -> generate -> insert_entry
//!      -> commit on <prefix><short after> -> force-push branch -> open PR
//! ```
//!
//! # Release flow
//!
//! ```text
//! lock -> ledger check -> fetch integration tip -> release(today)
//!      -> commit on tip -> push tip:integration -> ledger record
//! ```
//!
//! Nothing here touches a working tree: the changelog is read from a commit
//! and written back as a new commit with [`Git::commit_file`]. A failure
//! before the push leaves at most an unreferenced commit behind.
//!
//! git2 is blocking, so every repository step runs on
//! [`tokio::task::spawn_blocking`]. The repository lock
//! (`<git_dir>/doctrace/lock`) is held from the first read to the last write,
//! which keeps a CLI invocation and the server from interleaving.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::core::changelog::{self, has_pending_entries, insert_entry};
use crate::core::config::{Config, Secrets};
use crate::core::ops::FileLock;
use crate::core::types::{BranchName, Oid, RefName};
use crate::forge::Forge;
use crate::generator::EntryGenerator;
use crate::git::{DiffOutput, Git, GitError, Identity};
use crate::webhook::Action;

use super::error::PipelineError;
use super::ledger::ReleaseLedger;

/// Private ref the integration branch is fetched into.
const INTEGRATION_TRACKING_REF: &str = "refs/doctrace/integration";
/// Private ref holding a release commit until it is pushed.
const RELEASE_REF: &str = "refs/doctrace/release";

/// Repository-side settings of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub repo_path: PathBuf,
    pub remote: String,
    pub integration_branch: String,
    pub changelog_path: String,
    pub branch_prefix: String,
    /// Fetch the integration branch from `remote` before reading it.
    pub fetch: bool,
    /// Prefix of commit messages and PR titles; the dispatcher treats
    /// commits starting with it as automation.
    pub marker: String,
    pub author: Identity,
    pub token: Option<String>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config, secrets: &Secrets, repo_path: PathBuf) -> Self {
        let marker = config
            .markers()
            .into_iter()
            .next()
            .unwrap_or_else(|| Config::DEFAULT_MARKERS[0].to_string());
        Self {
            repo_path,
            remote: config.remote().to_string(),
            integration_branch: config.integration_branch().to_string(),
            changelog_path: config.changelog_path().to_string(),
            branch_prefix: config.branch_prefix().to_string(),
            fetch: config.fetch_before_diff(),
            marker,
            author: Identity {
                name: config.author_name().to_string(),
                email: config.author_email().to_string(),
            },
            token: secrets.github_token.clone(),
        }
    }

    fn integration_ref(&self) -> String {
        format!("refs/heads/{}", self.integration_branch)
    }

    /// Ref the integration tip is read from.
    fn integration_source(&self) -> String {
        if self.fetch {
            INTEGRATION_TRACKING_REF.to_string()
        } else {
            self.integration_ref()
        }
    }

    fn fetch_integration(&self, git: &Git) -> Result<(), GitError> {
        if !self.fetch {
            return Ok(());
        }
        let refspec = format!("+{}:{INTEGRATION_TRACKING_REF}", self.integration_ref());
        git.fetch(&self.remote, &[refspec], self.token.as_deref())
    }

    fn integration_tip(&self, git: &Git) -> Result<Oid, GitError> {
        git.resolve_ref(&self.integration_source())
    }
}

/// What the pipeline did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// An entry commit was pushed and a pull request opened (or reused).
    EntryProposed {
        branch: String,
        url: String,
        commit: Oid,
    },
    /// The pushed range changes no files.
    NoChanges,
    Released {
        pr: u64,
        date: NaiveDate,
        commit: Oid,
    },
    /// This pull request already produced a release.
    AlreadyReleased { pr: u64 },
    /// The Unreleased section is empty or missing.
    NothingToRelease { pr: u64 },
}

impl PipelineOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::EntryProposed { .. } => "entry_proposed",
            PipelineOutcome::NoChanges => "no_changes",
            PipelineOutcome::Released { .. } => "released",
            PipelineOutcome::AlreadyReleased { .. } => "already_released",
            PipelineOutcome::NothingToRelease { .. } => "nothing_to_release",
        }
    }
}

impl std::fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineOutcome::EntryProposed { branch, url, .. } => {
                write!(f, "proposed changelog entry on {branch}: {url}")
            }
            PipelineOutcome::NoChanges => write!(f, "no file changes to describe"),
            PipelineOutcome::Released { pr, date, commit } => {
                write!(f, "released {date} for #{pr} in {}", commit.short(7))
            }
            PipelineOutcome::AlreadyReleased { pr } => write!(f, "#{pr} was already released"),
            PipelineOutcome::NothingToRelease { pr } => {
                write!(f, "nothing to release for #{pr}")
            }
        }
    }
}

/// The changelog pipeline with its collaborators.
#[derive(Clone)]
pub struct Pipeline {
    settings: Arc<PipelineSettings>,
    generator: Arc<dyn EntryGenerator>,
    forge: Arc<dyn Forge>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .field("forge", &self.forge.name())
            .finish()
    }
}

/// Result of the first half of the entry flow.
struct Prepared {
    lock: FileLock,
    diff: DiffOutput,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        generator: Arc<dyn EntryGenerator>,
        forge: Arc<dyn Forge>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            generator,
            forge,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the work an action calls for; `None` for actions without work.
    pub async fn handle(&self, action: &Action) -> Result<Option<PipelineOutcome>, PipelineError> {
        match action {
            Action::GenerateEntry { before, after } => {
                self.generate_entry(before, after).await.map(Some)
            }
            Action::Release { number } => self.release(*number).await.map(Some),
            Action::Pong | Action::Ignore(_) => Ok(None),
        }
    }

    /// Summarize `before..after` and propose it as a changelog pull request.
    pub async fn generate_entry(
        &self,
        before: &Oid,
        after: &Oid,
    ) -> Result<PipelineOutcome, PipelineError> {
        let settings = Arc::clone(&self.settings);
        let (old, new) = (before.clone(), after.clone());
        let prepared = tokio::task::spawn_blocking(move || -> Result<Prepared, PipelineError> {
            let git = Git::open(&settings.repo_path)?;
            let lock = FileLock::for_repo(git.git_dir())?;
            settings.fetch_integration(&git)?;
            let diff = git.diff(&old, &new)?;
            Ok(Prepared { lock, diff })
        })
        .await??;

        if prepared.diff.is_empty() {
            info!(before = %before.short(7), after = %after.short(7), "no changed files");
            return Ok(PipelineOutcome::NoChanges);
        }
        debug!(files = prepared.diff.changed_files.len(), "diff extracted");

        let entry = self.generator.generate(&prepared.diff.patch).await?;

        let settings = Arc::clone(&self.settings);
        let tip = after.clone();
        let body_entry = entry.clone();
        let (branch, commit) =
            tokio::task::spawn_blocking(move || -> Result<(BranchName, Oid), PipelineError> {
                let git = Git::open(&settings.repo_path)?;
                let current = git
                    .read_file_at(&tip, &settings.changelog_path)?
                    .unwrap_or_default();
                let updated = insert_entry(&current, &entry)?;

                let message = format!(
                    "{}: update changelog for {}",
                    settings.marker,
                    tip.short(7)
                );
                let commit = git.commit_file(
                    &tip,
                    &settings.changelog_path,
                    updated.as_bytes(),
                    &message,
                    &settings.author,
                )?;

                let branch = BranchName::new(format!("{}{}", settings.branch_prefix, tip.short(7)))
                    .map_err(GitError::from)?;
                git.set_branch(&branch, &commit, "doctrace: changelog entry")?;
                let refspec = format!("+refs/heads/{branch}:refs/heads/{branch}");
                git.push(&settings.remote, &[refspec], settings.token.as_deref())?;
                Ok((branch, commit))
            })
            .await??;

        let title = format!("{}: update changelog for {}", self.settings.marker, after.short(7));
        let body = format!(
            "Changelog entry for {}..{}.\n\n{body_entry}\n",
            before.short(7),
            after.short(7)
        );
        let url = self
            .forge
            .open_request(
                branch.as_str(),
                &title,
                &body,
                &self.settings.integration_branch,
            )
            .await?;
        drop(prepared.lock);

        info!(branch = %branch, url = %url, commit = %commit.short(7), "changelog entry proposed");
        Ok(PipelineOutcome::EntryProposed {
            branch: branch.to_string(),
            url,
            commit,
        })
    }

    /// Release the Unreleased section after pull request `pr` merged.
    pub async fn release(&self, pr: u64) -> Result<PipelineOutcome, PipelineError> {
        self.release_on(pr, changelog::today()).await
    }

    /// [`Pipeline::release`] with an explicit release date.
    pub async fn release_on(
        &self,
        pr: u64,
        date: NaiveDate,
    ) -> Result<PipelineOutcome, PipelineError> {
        let settings = Arc::clone(&self.settings);
        tokio::task::spawn_blocking(move || release_blocking(&settings, pr, date)).await?
    }
}

fn release_blocking(
    settings: &PipelineSettings,
    pr: u64,
    date: NaiveDate,
) -> Result<PipelineOutcome, PipelineError> {
    let git = Git::open(&settings.repo_path)?;
    let _lock = FileLock::for_repo(git.git_dir())?;

    let mut ledger = ReleaseLedger::load(git.git_dir())?;
    if ledger.contains(pr) {
        info!(pr, "release already recorded");
        return Ok(PipelineOutcome::AlreadyReleased { pr });
    }

    settings.fetch_integration(&git)?;
    let tip = settings.integration_tip(&git)?;
    let current = git
        .read_file_at(&tip, &settings.changelog_path)?
        .unwrap_or_default();

    if !has_pending_entries(&current)? {
        info!(pr, "unreleased section is empty");
        ledger.record(pr, date, None)?;
        return Ok(PipelineOutcome::NothingToRelease { pr });
    }

    let released = changelog::release(&current, date)?;
    let message = format!("{}: release {date}", settings.marker);
    let commit = git.commit_file(
        &tip,
        &settings.changelog_path,
        released.as_bytes(),
        &message,
        &settings.author,
    )?;

    let release_ref = RefName::new(RELEASE_REF).map_err(GitError::from)?;
    git.update_ref(&release_ref, &commit, "doctrace: release")?;
    let refspec = format!("{RELEASE_REF}:{}", settings.integration_ref());
    git.push(&settings.remote, &[refspec], settings.token.as_deref())?;

    ledger.record(pr, date, Some(commit.to_string()))?;
    info!(pr, %date, commit = %commit.short(7), "released");
    Ok(PipelineOutcome::Released { pr, date, commit })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(fetch: bool) -> PipelineSettings {
        PipelineSettings {
            repo_path: PathBuf::from("."),
            remote: "origin".into(),
            integration_branch: "main".into(),
            changelog_path: "CHANGELOG.md".into(),
            branch_prefix: "changelog/".into(),
            fetch,
            marker: "chore(changelog)".into(),
            author: Identity {
                name: "doctrace".into(),
                email: "doctrace@example.com".into(),
            },
            token: None,
        }
    }

    #[test]
    fn settings_from_config_defaults() {
        let config = Config::default();
        let s = PipelineSettings::from_config(&config, &Secrets::default(), PathBuf::from("/srv/app"));
        assert_eq!(s.marker, "chore(changelog)");
        assert_eq!(s.integration_branch, "main");
        assert_eq!(s.changelog_path, "CHANGELOG.md");
        assert!(s.fetch);
        assert!(s.token.is_none());
    }

    #[test]
    fn integration_source_depends_on_fetch() {
        assert_eq!(settings(true).integration_source(), INTEGRATION_TRACKING_REF);
        assert_eq!(settings(false).integration_source(), "refs/heads/main");
        assert_eq!(settings(false).integration_ref(), "refs/heads/main");
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(PipelineOutcome::NoChanges.label(), "no_changes");
        assert_eq!(
            PipelineOutcome::AlreadyReleased { pr: 3 }.to_string(),
            "#3 was already released"
        );
    }
}
