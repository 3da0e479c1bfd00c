//! webhook::event
//!
//! Typed view of the GitHub deliveries doctrace reacts to.
//!
//! Only the fields the dispatcher and pipeline read are modeled; everything
//! else in the payload is ignored. Unknown event types parse to
//! [`Event::Other`] so they can be acknowledged and ignored.

use serde::Deserialize;
use thiserror::Error;

use crate::core::types::Oid;

/// Errors from payload parsing.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("missing X-GitHub-Event header")]
    MissingEventType,

    #[error("invalid {event} payload: {source}")]
    InvalidPayload {
        event: String,
        source: serde_json::Error,
    },
}

/// A parsed webhook delivery.
#[derive(Debug, Clone)]
pub enum Event {
    Ping,
    Push(PushEvent),
    PullRequest(PullRequestEvent),
    Other(String),
}

impl Event {
    /// Parse a delivery from its `X-GitHub-Event` name and body.
    pub fn parse(event_type: &str, body: &[u8]) -> Result<Self, EventError> {
        let invalid = |source: serde_json::Error| EventError::InvalidPayload {
            event: event_type.to_string(),
            source,
        };
        match event_type {
            "" => Err(EventError::MissingEventType),
            "ping" => Ok(Event::Ping),
            "push" => serde_json::from_slice(body).map(Event::Push).map_err(invalid),
            "pull_request" => serde_json::from_slice(body)
                .map(Event::PullRequest)
                .map_err(invalid),
            other => Ok(Event::Other(other.to_string())),
        }
    }

    /// The `X-GitHub-Event` name this event came from.
    pub fn name(&self) -> &str {
        match self {
            Event::Ping => "ping",
            Event::Push(_) => "push",
            Event::PullRequest(_) => "pull_request",
            Event::Other(name) => name,
        }
    }
}

/// `push` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub before: Oid,
    pub after: Oid,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
}

impl PushEvent {
    /// Message of the commit the branch now points at.
    pub fn head_message(&self) -> Option<&str> {
        self.head_commit.as_ref().map(|c| c.message.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    pub message: String,
}

/// `pull_request` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequestPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    #[serde(default)]
    pub merged: bool,
    pub head: BranchRef,
    pub base: BranchRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUSH: &str = r#"{
        "ref": "refs/heads/main",
        "before": "1111111111111111111111111111111111111111",
        "after": "2222222222222222222222222222222222222222",
        "created": false,
        "deleted": false,
        "head_commit": {"id": "2222222222222222222222222222222222222222", "message": "feat: add parser"},
        "commits": [{"id": "2222222222222222222222222222222222222222", "message": "feat: add parser"}],
        "repository": {"full_name": "acme/app"}
    }"#;

    #[test]
    fn parses_push() {
        let Event::Push(push) = Event::parse("push", PUSH.as_bytes()).unwrap() else {
            panic!("expected push");
        };
        assert_eq!(push.git_ref, "refs/heads/main");
        assert_eq!(push.head_message(), Some("feat: add parser"));
        assert_eq!(push.after.short(7), "2222222");
        assert!(!push.before.is_zero());
    }

    #[test]
    fn parses_merged_pull_request() {
        let body = r#"{
            "action": "closed", "number": 12,
            "pull_request": {
                "merged": true, "title": "Update changelog",
                "html_url": "https://github.com/acme/app/pull/12",
                "head": {"ref": "changelog/abc1234"}, "base": {"ref": "main"},
                "merge_commit_sha": "3333333333333333333333333333333333333333"
            }
        }"#;
        let Event::PullRequest(pr) = Event::parse("pull_request", body.as_bytes()).unwrap() else {
            panic!("expected pull_request");
        };
        assert_eq!(pr.number, 12);
        assert!(pr.pull_request.merged);
        assert_eq!(pr.pull_request.head.name, "changelog/abc1234");
    }

    #[test]
    fn ping_ignores_body() {
        assert!(matches!(Event::parse("ping", b"not json").unwrap(), Event::Ping));
    }

    #[test]
    fn unknown_events_are_other() {
        let event = Event::parse("issues", b"{}").unwrap();
        assert_eq!(event.name(), "issues");
    }

    #[test]
    fn invalid_payload_reports_event() {
        let err = Event::parse("push", b"{\"ref\": 1}").unwrap_err();
        assert!(err.to_string().starts_with("invalid push payload"));
    }

    #[test]
    fn missing_event_type() {
        assert!(matches!(Event::parse("", b"{}"), Err(EventError::MissingEventType)));
    }
}
