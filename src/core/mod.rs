//! core
//!
//! Domain types, the changelog model, configuration and persistence primitives.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName
//! - [`changelog`] - Document model and the insert/release transformations
//! - [`config`] - Configuration schema and loading
//! - [`ops`] - Locking and atomic file transactions
//!
//! # Design Principles
//!
//! - Document transformations are pure functions over text
//! - I/O is confined to `ops` and to the callers in `engine` and `cli`
//! - Schemas are strict and validated at load time

pub mod changelog;
pub mod config;
pub mod ops;
pub mod types;
