//! doctrace - keeps a repository changelog up to date from webhook events
//!
//! A push to the integration branch is diffed, summarized into changelog
//! bullets by a language model, inserted under the `## [Unreleased]` section
//! and proposed as a pull request. Merging that pull request releases the
//! section: it is stamped with the date and a fresh, empty Unreleased
//! section opens after it.
//!
//! # Architecture
//!
//! - [`core`] - Changelog document model and mutators, config, locking, types
//! - [`git`] - Single interface for all Git operations
//! - [`generator`] - Diff to changelog entry (chat-completions API)
//! - [`forge`] - Pull request creation (GitHub)
//! - [`webhook`] - Signature check, payload parsing, event classification
//! - [`engine`] - The pipeline tying the above together
//! - [`server`] - axum HTTP surface
//! - [`cli`] - Command-line interface
//!
//! # Correctness Invariants
//!
//! 1. A changelog holds at most one Unreleased section
//! 2. Inserting an entry never changes any other section
//! 3. The changelog is never partially written
//! 4. The service never reacts to its own commits

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod generator;
pub mod git;
pub mod server;
pub mod webhook;
