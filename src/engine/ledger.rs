//! engine::ledger
//!
//! Record of pull requests whose merge already produced a release.
//!
//! GitHub redelivers webhooks, and a release is not idempotent: releasing
//! twice stamps a second, empty dated section. The ledger lives at
//! `<git_dir>/doctrace/releases.json` and is consulted before, and written
//! after, each release. It is only read and written while the repository
//! lock is held.
//!
//! ```json
//! {
//!   "version": 1,
//!   "releases": [
//!     { "pr": 12, "date": "2024-06-01", "commit": "3f2a...", "recorded_at": "2024-06-01T10:00:00Z" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::ops::{write_atomic, STATE_DIR};

const LEDGER_FILE: &str = "releases.json";
const LEDGER_VERSION: u32 = 1;

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read release ledger '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write release ledger '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The ledger file exists but does not parse.
    #[error("release ledger corrupted: {0}")]
    Corrupted(String),
}

/// One completed (or deliberately skipped) release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub pr: u64,
    pub date: NaiveDate,
    /// Release commit pushed to the integration branch; `None` when the
    /// Unreleased section was empty and nothing was pushed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    #[serde(default)]
    releases: Vec<ReleaseRecord>,
}

/// Released pull request numbers for one repository.
#[derive(Debug)]
pub struct ReleaseLedger {
    path: PathBuf,
    releases: Vec<ReleaseRecord>,
}

impl ReleaseLedger {
    /// Path of the ledger for the repository at `git_dir`.
    pub fn path_for(git_dir: &Path) -> PathBuf {
        git_dir.join(STATE_DIR).join(LEDGER_FILE)
    }

    /// Load the ledger for `git_dir`; a missing file is an empty ledger.
    pub fn load(git_dir: &Path) -> Result<Self, LedgerError> {
        let path = Self::path_for(git_dir);
        let releases = match std::fs::read_to_string(&path) {
            Ok(text) => {
                let file: LedgerFile = serde_json::from_str(&text)
                    .map_err(|e| LedgerError::Corrupted(e.to_string()))?;
                if file.version != LEDGER_VERSION {
                    return Err(LedgerError::Corrupted(format!(
                        "unsupported version {}",
                        file.version
                    )));
                }
                file.releases
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(LedgerError::Read { path, source }),
        };
        Ok(Self { path, releases })
    }

    pub fn contains(&self, pr: u64) -> bool {
        self.releases.iter().any(|r| r.pr == pr)
    }

    pub fn get(&self, pr: u64) -> Option<&ReleaseRecord> {
        self.releases.iter().find(|r| r.pr == pr)
    }

    pub fn releases(&self) -> &[ReleaseRecord] {
        &self.releases
    }

    /// Add a record and persist the ledger.
    pub fn record(
        &mut self,
        pr: u64,
        date: NaiveDate,
        commit: Option<String>,
    ) -> Result<(), LedgerError> {
        self.releases.push(ReleaseRecord {
            pr,
            date,
            commit,
            recorded_at: Utc::now(),
        });
        self.save()
    }

    fn save(&self) -> Result<(), LedgerError> {
        let file = LedgerFile {
            version: LEDGER_VERSION,
            releases: self.releases.clone(),
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| LedgerError::Corrupted(e.to_string()))?;
        write_atomic(&self.path, &json).map_err(|source| LedgerError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ReleaseLedger::load(dir.path()).unwrap();
        assert!(ledger.releases().is_empty());
        assert!(!ledger.contains(1));
    }

    #[test]
    fn record_persists() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ReleaseLedger::load(dir.path()).unwrap();
        ledger.record(12, date(), Some("abc".into())).unwrap();
        ledger.record(13, date(), None).unwrap();

        let reloaded = ReleaseLedger::load(dir.path()).unwrap();
        assert!(reloaded.contains(12));
        assert!(reloaded.contains(13));
        assert_eq!(reloaded.get(12).unwrap().commit.as_deref(), Some("abc"));
        assert_eq!(reloaded.get(13).unwrap().commit, None);
        assert!(ReleaseLedger::path_for(dir.path()).ends_with("doctrace/releases.json"));
    }

    #[test]
    fn corrupted_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = ReleaseLedger::path_for(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ReleaseLedger::load(dir.path()),
            Err(LedgerError::Corrupted(_))
        ));
    }

    #[test]
    fn unknown_version_rejected() {
        let dir = TempDir::new().unwrap();
        let path = ReleaseLedger::path_for(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"version": 9, "releases": []}"#).unwrap();
        assert!(matches!(
            ReleaseLedger::load(dir.path()),
            Err(LedgerError::Corrupted(_))
        ));
    }
}
