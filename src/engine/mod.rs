//! engine
//!
//! Orchestration between the webhook surface and the repository.
//!
//! # Architecture
//!
//! ```text
//! Action -> Pipeline -> (git, generator, forge) -> PipelineOutcome
//! ```
//!
//! The pure changelog transforms live in `core::changelog`; this module owns
//! every side effect around them: locking, reading and committing the
//! changelog blob, pushing, opening pull requests, and recording releases.
//!
//! # Invariants
//!
//! - One pipeline run at a time per repository (file lock)
//! - The changelog is never partially written
//! - A merged pull request produces at most one release (ledger)

pub mod error;
pub mod ledger;
pub mod pipeline;

pub use error::{ErrorKind, PipelineError};
pub use ledger::{LedgerError, ReleaseLedger, ReleaseRecord};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineSettings};
