//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the only doorway to git. No other module imports `git2`,
//! and nothing shells out to the git CLI.
//!
//! # Responsibilities
//!
//! - Repository discovery and revision resolution
//! - Tree-to-tree diffs between pushed commits
//! - Reading a file at a commit and committing a new version of it
//! - Moving branch refs and pushing/fetching them
//! - GitHub remote URL parsing
//!
//! # Example
//!
//! ```ignore
//! use doctrace::git::extract_diff;
//! use std::path::Path;
//!
//! let diff = extract_diff(Path::new("."), "HEAD~1", "HEAD")?;
//! print!("{}", diff.patch);
//! ```

mod interface;

pub use interface::{CommitInfo, DiffOutput, Git, GitError, Identity};

use std::path::Path;

/// Diff two revisions of the repository at `repo_path`.
///
/// # Errors
///
/// - [`GitError::NotARepo`] if `repo_path` is not inside a repository
/// - [`GitError::RevisionNotFound`] if either revision is absent locally
pub fn extract_diff(repo_path: &Path, old: &str, new: &str) -> Result<DiffOutput, GitError> {
    let git = Git::open(repo_path)?;
    let old = git.resolve_commit(old)?;
    let new = git.resolve_commit(new)?;
    git.diff(&old, &new)
}
