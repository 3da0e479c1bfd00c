//! webhook
//!
//! Inbound side of the service: delivery authentication, payload parsing
//! and classification.
//!
//! - [`signature`] - `X-Hub-Signature-256` verification
//! - [`event`] - typed payloads for the events doctrace handles
//! - [`dispatch`] - maps an event to an [`Action`]

pub mod dispatch;
pub mod event;
pub mod signature;

pub use dispatch::{Action, Dispatcher, IgnoreReason};
pub use event::{Event, EventError};
pub use signature::{sign, verify, SignatureError};
