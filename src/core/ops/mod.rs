//! core::ops
//!
//! Locking and atomic persistence around the pure changelog mutators.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive cross-process lock (`fs2`)
//! - [`transaction`] - Locked read-modify-write of a file with atomic replace
//!
//! # Architecture
//!
//! Every mutating operation:
//! 1. Acquires the exclusive lock
//! 2. Reads the current document
//! 3. Applies a pure transformation from `core::changelog`
//! 4. Persists the result in a single atomic step
//! 5. Releases the lock (on drop)

pub mod lock;
pub mod transaction;

pub use lock::{sidecar_path, FileLock, LockError, STATE_DIR};
pub use transaction::{edit_file, write_atomic, Outcome, TransactionError};
