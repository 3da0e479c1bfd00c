//! core::changelog
//!
//! The changelog document model and the pure transformations applied to it.
//!
//! # Modules
//!
//! - [`document`] - Lossless parse/serialize of a markdown changelog into typed sections
//! - [`mutator`] - `insert_entry` and `release`, both `&str -> String`
//!
//! # Architecture
//!
//! Everything here is free of I/O. Callers read the document (from a file
//! or a git blob), hand the text to a mutator and persist whatever comes
//! back. A document is parsed fresh for every operation; nothing is cached
//! between deliveries.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use doctrace::core::changelog::{insert_entry, release};
//!
//! let doc = "## [Unreleased]\n\n## 2024-01-01\n- old\n";
//! let doc = insert_entry(doc, "- new change").unwrap();
//! assert_eq!(doc, "## [Unreleased]\n- new change\n\n## 2024-01-01\n- old\n");
//!
//! let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let doc = release(&doc, date).unwrap();
//! assert!(doc.starts_with("## 2024-06-01\n- new change\n"));
//! ```

pub mod document;
pub mod mutator;

pub use document::{Changelog, Section, SectionKind};
pub use mutator::{has_pending_entries, insert_entry, release, today};

use thiserror::Error;

/// Errors from changelog parsing and mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangelogError {
    /// The document violates a structural invariant.
    #[error("malformed changelog: {0}")]
    MalformedDocument(String),

    /// The entry to insert has no non-blank lines.
    #[error("changelog entry is empty")]
    EmptyEntry,
}
