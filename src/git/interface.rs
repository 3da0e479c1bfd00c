//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module is the single doorway to git for doctrace. All repository
//! access flows through [`Git`], which returns structured results and
//! normalizes git2 errors into typed failure categories.
//!
//! # Object-level writes
//!
//! The webhook pipeline never touches a working tree. A changelog update is
//! written as blob, tree and commit directly into the object database
//! ([`Git::commit_file`]) and published by moving a branch ref
//! ([`Git::set_branch`]) and pushing it ([`Git::push`]). This works the same
//! for bare clones and for checkouts that a developer is using.
//!
//! # Example
//!
//! ```ignore
//! use doctrace::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let diff = git.diff(&before, &after)?;
//! println!("{} files changed", diff.changed_files.len());
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::types::{BranchName, Oid, RefName, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// A revision named by the caller is not in the local object database.
    #[error("revision not found: {rev}")]
    RevisionNotFound { rev: String },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    /// Invalid object id or ref name.
    #[error("invalid name: {message}")]
    InvalidName { message: String },

    /// Blob content is not valid UTF-8.
    #[error("'{path}' is not valid UTF-8")]
    InvalidUtf8 { path: String },

    /// The remote refused an update.
    #[error("push to {remote} rejected: {message}")]
    PushRejected { remote: String, message: String },

    /// Transport or authentication failure talking to a remote.
    #[error("remote {remote}: {message}")]
    Remote { remote: String, message: String },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

impl GitError {
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match (err.code(), err.class()) {
            (git2::ErrorCode::NotFound, git2::ErrorClass::Reference) => GitError::RefNotFound {
                refname: context.to_string(),
            },
            (git2::ErrorCode::NotFound, _) => GitError::RevisionNotFound {
                rev: context.to_string(),
            },
            (_, git2::ErrorClass::Odb) => GitError::RevisionNotFound {
                rev: context.to_string(),
            },
            (git2::ErrorCode::InvalidSpec, _) => GitError::InvalidName {
                message: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    fn remote(err: git2::Error, remote: &str) -> Self {
        GitError::Remote {
            remote: remote.to_string(),
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::InvalidName {
            message: err.to_string(),
        }
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_time: chrono::DateTime<chrono::Utc>,
    pub parent_count: usize,
}

/// Result of diffing two commits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutput {
    /// Paths touched by the diff; the pre-image path, or the post-image
    /// path for added files.
    pub changed_files: Vec<String>,
    /// Unified diff text of all changes.
    pub patch: String,
}

impl DiffOutput {
    pub fn is_empty(&self) -> bool {
        self.changed_files.is_empty()
    }
}

/// Author identity for commits written by doctrace.
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// The Git interface.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open the repository containing `path`. Bare repositories are accepted.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// The `.git` directory (or the repository itself when bare).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// The working directory, if any.
    pub fn work_dir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    // =========================================================================
    // Ref and Revision Resolution
    // =========================================================================

    /// Resolve a ref to the commit it points at.
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;
        let commit = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?;
        Ok(Oid::new(commit.id().to_string())?)
    }

    /// Resolve a ref, returning None if it doesn't exist.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve any revision expression (`HEAD~1`, a short sha, a branch) to a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::RevisionNotFound`] if it does not name a local commit
    pub fn resolve_commit(&self, rev: &str) -> Result<Oid, GitError> {
        let object = self
            .repo
            .revparse_single(rev)
            .map_err(|_| GitError::RevisionNotFound {
                rev: rev.to_string(),
            })?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| GitError::RevisionNotFound {
                rev: rev.to_string(),
            })?;
        Ok(Oid::new(commit.id().to_string())?)
    }

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        let git_oid = git2::Oid::from_str(oid.as_str())
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        self.repo
            .find_commit(git_oid)
            .map_err(|_| GitError::RevisionNotFound {
                rev: oid.to_string(),
            })
    }

    // =========================================================================
    // Commit Information
    // =========================================================================

    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self.find_commit(oid)?;
        let author = commit.author();
        let author_time = chrono::DateTime::from_timestamp(author.when().seconds(), 0)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH);

        Ok(CommitInfo {
            oid: oid.clone(),
            summary: commit.summary().unwrap_or("").to_string(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            author_time,
            parent_count: commit.parent_count(),
        })
    }

    // =========================================================================
    // Diff
    // =========================================================================

    /// Diff the trees of two commits.
    ///
    /// # Errors
    ///
    /// - [`GitError::RevisionNotFound`] if either commit is absent locally
    pub fn diff(&self, old: &Oid, new: &Oid) -> Result<DiffOutput, GitError> {
        let old_tree = self.find_commit(old)?.tree()?;
        let new_tree = self.find_commit(new)?.tree()?;

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)
            .map_err(|e| GitError::from_git2(e, "diff"))?;

        let changed_files = diff
            .deltas()
            .filter_map(|delta| delta.old_file().path().or_else(|| delta.new_file().path()))
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let mut patch = String::new();
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin());
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .map_err(|e| GitError::from_git2(e, "diff"))?;

        Ok(DiffOutput {
            changed_files,
            patch,
        })
    }

    // =========================================================================
    // Reading and Writing Files as Objects
    // =========================================================================

    /// Contents of `path` in the tree of `commit`; `None` if the file is absent.
    pub fn read_file_at(&self, commit: &Oid, path: &str) -> Result<Option<String>, GitError> {
        let tree = self.find_commit(commit)?.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, path)),
        };
        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(|e| GitError::from_git2(e, path))?;
        let text = String::from_utf8(blob.content().to_vec()).map_err(|_| GitError::InvalidUtf8 {
            path: path.to_string(),
        })?;
        Ok(Some(text))
    }

    /// Create a commit on top of `parent` that sets `path` to `contents`.
    ///
    /// No ref is moved; the new commit is only reachable through the
    /// returned id until [`Git::set_branch`] publishes it.
    pub fn commit_file(
        &self,
        parent: &Oid,
        path: &str,
        contents: &[u8],
        message: &str,
        author: &Identity,
    ) -> Result<Oid, GitError> {
        let parent_commit = self.find_commit(parent)?;
        let base_tree = parent_commit.tree()?;

        let blob = self.repo.blob(contents)?;
        let mut index = git2::Index::new()?;
        index.read_tree(&base_tree)?;
        index.add(&git2::IndexEntry {
            ctime: git2::IndexTime::new(0, 0),
            mtime: git2::IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: u32::try_from(contents.len()).unwrap_or(u32::MAX),
            id: blob,
            flags: 0,
            flags_extended: 0,
            path: path.as_bytes().to_vec(),
        })?;
        let tree_id = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;

        let signature = git2::Signature::now(&author.name, &author.email)?;
        let commit = self.repo.commit(
            None,
            &signature,
            &signature,
            message,
            &tree,
            &[&parent_commit],
        )?;
        debug!(commit = %commit, parent = %parent, path, "wrote commit");
        Ok(Oid::new(commit.to_string())?)
    }

    /// Point `branch` at `target`, creating or force-moving it.
    pub fn set_branch(&self, branch: &BranchName, target: &Oid, reason: &str) -> Result<(), GitError> {
        self.update_ref(&RefName::for_branch(branch), target, reason)
    }

    /// Point any ref at `target`, creating or force-moving it.
    pub fn update_ref(&self, refname: &RefName, target: &Oid, reason: &str) -> Result<(), GitError> {
        let oid = git2::Oid::from_str(target.as_str())
            .map_err(|e| GitError::from_git2(e, target.as_str()))?;
        self.repo
            .reference(refname.as_str(), oid, true, reason)
            .map_err(|e| GitError::from_git2(e, refname.as_str()))?;
        Ok(())
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Push refspecs to a remote (a configured name or a URL/path).
    ///
    /// HTTPS remotes authenticate as `x-access-token` with `token`; SSH
    /// remotes use the agent.
    pub fn push(&self, remote: &str, refspecs: &[String], token: Option<&str>) -> Result<(), GitError> {
        let mut handle = self.find_remote(remote)?;
        let rejected: RefCell<Vec<String>> = RefCell::new(Vec::new());

        let mut callbacks = credential_callbacks(token);
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                rejected.borrow_mut().push(format!("{refname}: {message}"));
            }
            Ok(())
        });

        let mut options = git2::PushOptions::new();
        options.remote_callbacks(callbacks);
        handle
            .push(refspecs, Some(&mut options))
            .map_err(|e| GitError::remote(e, remote))?;
        drop(options);

        let rejected = rejected.into_inner();
        if !rejected.is_empty() {
            return Err(GitError::PushRejected {
                remote: remote.to_string(),
                message: rejected.join("; "),
            });
        }
        debug!(remote, ?refspecs, "pushed");
        Ok(())
    }

    /// Fetch refspecs from a remote.
    pub fn fetch(&self, remote: &str, refspecs: &[String], token: Option<&str>) -> Result<(), GitError> {
        let mut handle = self.find_remote(remote)?;
        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(credential_callbacks(token));
        handle
            .fetch(refspecs, Some(&mut options), None)
            .map_err(|e| GitError::remote(e, remote))?;
        debug!(remote, ?refspecs, "fetched");
        Ok(())
    }

    fn find_remote(&self, remote: &str) -> Result<git2::Remote<'_>, GitError> {
        match self.repo.find_remote(remote) {
            Ok(handle) => Ok(handle),
            Err(e) if e.code() == git2::ErrorCode::NotFound => self
                .repo
                .remote_anonymous(remote)
                .map_err(|e| GitError::remote(e, remote)),
            Err(e) => Err(GitError::remote(e, remote)),
        }
    }

    /// Get the URL for a remote. Returns `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Internal {
                message: e.message().to_string(),
            }),
        }
    }

    /// Parse a GitHub remote URL into `(owner, repo)`.
    ///
    /// ```
    /// use doctrace::git::Git;
    ///
    /// assert_eq!(
    ///     Git::parse_github_remote("git@github.com:acme/app.git"),
    ///     Some(("acme".to_string(), "app".to_string()))
    /// );
    /// assert_eq!(Git::parse_github_remote("/srv/git/app.git"), None);
    /// ```
    pub fn parse_github_remote(url: &str) -> Option<(String, String)> {
        let rest = url
            .strip_prefix("https://github.com/")
            .or_else(|| url.strip_prefix("ssh://git@github.com/"))
            .or_else(|| url.strip_prefix("git@github.com:"))?;
        let rest = rest.trim_end_matches('/');
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let (owner, repo) = rest.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some((owner.to_string(), repo.to_string()))
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

fn credential_callbacks(token: Option<&str>) -> git2::RemoteCallbacks<'_> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(move |_url, username, allowed| {
        if allowed.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
            if let Some(token) = token {
                return git2::Cred::userpass_plaintext("x-access-token", token);
            }
        }
        if allowed.contains(git2::CredentialType::SSH_KEY) {
            return git2::Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        git2::Cred::default()
    });
    callbacks
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_github_remote {
        use super::*;

        #[test]
        fn https_and_ssh_forms() {
            let expected = Some(("acme".to_string(), "app".to_string()));
            assert_eq!(Git::parse_github_remote("https://github.com/acme/app.git"), expected);
            assert_eq!(Git::parse_github_remote("https://github.com/acme/app"), expected);
            assert_eq!(Git::parse_github_remote("git@github.com:acme/app.git"), expected);
            assert_eq!(Git::parse_github_remote("ssh://git@github.com/acme/app.git"), expected);
        }

        #[test]
        fn other_hosts_rejected() {
            assert_eq!(Git::parse_github_remote("https://gitlab.com/acme/app.git"), None);
            assert_eq!(Git::parse_github_remote("https://github.com/acme"), None);
            assert_eq!(Git::parse_github_remote("https://github.com/a/b/c"), None);
        }
    }

    mod open {
        use super::*;

        #[test]
        fn outside_repository_fails() {
            let temp = tempfile::TempDir::new().unwrap();
            let result = Git::open(temp.path());
            assert!(matches!(result, Err(GitError::NotARepo { .. })));
        }

        #[test]
        fn bare_repository_is_accepted() {
            let temp = tempfile::TempDir::new().unwrap();
            git2::Repository::init_bare(temp.path()).unwrap();
            let git = Git::open(temp.path()).unwrap();
            assert!(git.work_dir().is_none());
        }

        #[test]
        fn unknown_revision_is_reported() {
            let temp = tempfile::TempDir::new().unwrap();
            git2::Repository::init(temp.path()).unwrap();
            let git = Git::open(temp.path()).unwrap();
            let result = git.resolve_commit("does-not-exist");
            assert!(matches!(result, Err(GitError::RevisionNotFound { .. })));
        }
    }
}
