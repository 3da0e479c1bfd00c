//! forge
//!
//! Abstraction for the remote forge that receives review requests.
//!
//! # Architecture
//!
//! The `Forge` trait defines the one thing the pipeline needs from a hosting
//! service: open (or find) a pull request for an automation branch. Forge
//! failures never compromise local state; by the time a request is opened
//! the changelog commit has already been pushed.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub REST implementation
//! - [`mock`]: In-memory implementation for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
