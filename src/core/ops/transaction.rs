//! core::ops::transaction
//!
//! Locked, atomic read-modify-write of a file on disk.
//!
//! The CLI `insert` and `release` commands go through [`edit_file`]: take
//! the sidecar lock, read the current text (a missing file reads as empty),
//! apply a pure transformation, and replace the file via temp file, fsync
//! and rename. Readers never observe a half-written changelog, and an error
//! from the transformation leaves the file untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::lock::{FileLock, LockError};

/// Errors from a file transaction.
#[derive(Debug, Error)]
pub enum TransactionError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The transformation itself failed; nothing was written.
    #[error(transparent)]
    Apply(E),
}

/// What a transaction did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Written,
    Unchanged,
}

/// Apply `f` to the contents of `path` under an exclusive lock.
pub fn edit_file<E, F>(path: &Path, f: F) -> Result<Outcome, TransactionError<E>>
where
    E: std::error::Error + 'static,
    F: FnOnce(&str) -> Result<String, E>,
{
    let _lock = FileLock::for_file(path)?;

    let current = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(TransactionError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let updated = f(&current).map_err(TransactionError::Apply)?;
    if updated == current {
        debug!(path = %path.display(), "no change, skipping write");
        return Ok(Outcome::Unchanged);
    }

    write_atomic(path, updated.as_bytes()).map_err(|source| TransactionError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = updated.len(), "file replaced");
    Ok(Outcome::Written)
}

/// Write `contents` to `path` through a sibling temp file and rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    let temp_path = path.with_file_name(temp_name);

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::changelog::{insert_entry, ChangelogError};
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("CHANGELOG.md");

        let outcome = edit_file(&path, |text| insert_entry(text, "- first")).unwrap();
        assert_eq!(outcome, Outcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "## [Unreleased]\n- first\n\n");
    }

    #[test]
    fn failed_transform_leaves_file_alone() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("CHANGELOG.md");
        fs::write(&path, "## [Unreleased]\n## [Unreleased]\n").unwrap();

        let err = edit_file(&path, |text| insert_entry(text, "- x")).unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Apply(ChangelogError::MalformedDocument(_))
        ));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "## [Unreleased]\n## [Unreleased]\n"
        );
    }

    #[test]
    fn identical_output_is_not_written() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("CHANGELOG.md");
        fs::write(&path, "## 2024-01-01\n").unwrap();

        let outcome = edit_file(&path, |text| Ok::<_, ChangelogError>(text.to_string())).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.md");
        write_atomic(&path, b"hello").unwrap();
        write_atomic(&path, b"again").unwrap();

        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.md")]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "again");
    }
}
