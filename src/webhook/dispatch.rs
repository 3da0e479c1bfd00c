//! webhook::dispatch
//!
//! Decides what a delivery should trigger.
//!
//! The dispatcher is memoryless: each event is classified on its own
//! contents, with no knowledge of earlier deliveries. Loop prevention rests
//! entirely on recognizing the service's own commits by message.
//!
//! | Event | Condition | Action |
//! |---|---|---|
//! | `ping` | | [`Action::Pong`] |
//! | `push` | integration branch, not created/deleted, not an automation commit | [`Action::GenerateEntry`] |
//! | `pull_request` | `closed` + merged, automation head, integration base | [`Action::Release`] |
//! | anything else | | [`Action::Ignore`] |

use crate::core::config::Config;
use crate::core::types::Oid;

use super::event::{Event, PullRequestEvent, PushEvent};

/// What to do with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Pong,
    Ignore(IgnoreReason),
    /// Summarize `before..after` into a changelog entry and propose it.
    GenerateEntry { before: Oid, after: Oid },
    /// Release the Unreleased section after automation PR `number` merged.
    Release { number: u64 },
}

impl Action {
    /// Short label for logs and responses.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Pong => "pong",
            Action::Ignore(_) => "ignore",
            Action::GenerateEntry { .. } => "generate_entry",
            Action::Release { .. } => "release",
        }
    }
}

/// Why a delivery was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UnsupportedEvent(String),
    UntrackedRef(String),
    BranchCreated,
    BranchDeleted,
    AutomationCommit,
    PullRequestNotMerged,
    UntrackedPullRequest,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::UnsupportedEvent(name) => write!(f, "event '{name}' is not handled"),
            IgnoreReason::UntrackedRef(r) => write!(f, "push to untracked ref {r}"),
            IgnoreReason::BranchCreated => write!(f, "branch creation has no diff base"),
            IgnoreReason::BranchDeleted => write!(f, "branch deletion"),
            IgnoreReason::AutomationCommit => write!(f, "commit made by automation"),
            IgnoreReason::PullRequestNotMerged => write!(f, "pull request not merged"),
            IgnoreReason::UntrackedPullRequest => {
                write!(f, "pull request is not an automation request")
            }
        }
    }
}

/// Event classifier.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    integration_ref: String,
    integration_branch: String,
    branch_prefix: String,
    markers: Vec<String>,
}

impl Dispatcher {
    pub fn new(integration_branch: &str, branch_prefix: &str, markers: Vec<String>) -> Self {
        Self {
            integration_ref: format!("refs/heads/{integration_branch}"),
            integration_branch: integration_branch.to_string(),
            branch_prefix: branch_prefix.to_string(),
            markers,
        }
    }

    pub fn classify(&self, event: &Event) -> Action {
        match event {
            Event::Ping => Action::Pong,
            Event::Push(push) => self.classify_push(push),
            Event::PullRequest(pr) => self.classify_pull_request(pr),
            Event::Other(name) => Action::Ignore(IgnoreReason::UnsupportedEvent(name.clone())),
        }
    }

    fn classify_push(&self, push: &PushEvent) -> Action {
        if push.git_ref != self.integration_ref {
            return Action::Ignore(IgnoreReason::UntrackedRef(push.git_ref.clone()));
        }
        if push.deleted || push.after.is_zero() {
            return Action::Ignore(IgnoreReason::BranchDeleted);
        }
        if push.created || push.before.is_zero() {
            return Action::Ignore(IgnoreReason::BranchCreated);
        }
        if push
            .head_message()
            .is_some_and(|message| self.is_automation_message(message))
        {
            return Action::Ignore(IgnoreReason::AutomationCommit);
        }
        Action::GenerateEntry {
            before: push.before.clone(),
            after: push.after.clone(),
        }
    }

    fn classify_pull_request(&self, event: &PullRequestEvent) -> Action {
        let pr = &event.pull_request;
        if event.action != "closed" || !pr.merged {
            return Action::Ignore(IgnoreReason::PullRequestNotMerged);
        }
        if pr.base.name != self.integration_branch || !self.is_automation_branch(&pr.head.name) {
            return Action::Ignore(IgnoreReason::UntrackedPullRequest);
        }
        Action::Release {
            number: event.number,
        }
    }

    /// Whether a commit message was written by the service.
    ///
    /// True for messages starting with a configured marker, and for the
    /// GitHub merge commit of an automation branch
    /// (`Merge pull request #N from owner/<prefix>...`).
    pub fn is_automation_message(&self, message: &str) -> bool {
        let message = message.trim_start();
        if self.markers.iter().any(|m| message.starts_with(m.as_str())) {
            return true;
        }
        merged_branch(message).is_some_and(|branch| self.is_automation_branch(branch))
    }

    fn is_automation_branch(&self, branch: &str) -> bool {
        !self.branch_prefix.is_empty() && branch.starts_with(&self.branch_prefix)
    }
}

impl From<&Config> for Dispatcher {
    fn from(config: &Config) -> Self {
        Self::new(
            config.integration_branch(),
            config.branch_prefix(),
            config.markers(),
        )
    }
}

/// Branch name from a GitHub merge commit subject.
fn merged_branch(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("Merge pull request #")?;
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = rest[digits..].strip_prefix(" from ")?;
    let source = rest.split_whitespace().next()?;
    let (_owner, branch) = source.split_once('/')?;
    (!branch.is_empty()).then_some(branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEFORE: &str = "1111111111111111111111111111111111111111";
    const AFTER: &str = "2222222222222222222222222222222222222222";
    const ZERO: &str = "0000000000000000000000000000000000000000";

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            "main",
            "changelog/",
            vec!["chore(changelog)".to_string(), "docs(auto)".to_string()],
        )
    }

    fn push(git_ref: &str, before: &str, after: &str, message: &str) -> Event {
        let body = serde_json::json!({
            "ref": git_ref,
            "before": before,
            "after": after,
            "head_commit": {"id": after, "message": message},
        });
        Event::parse("push", body.to_string().as_bytes()).unwrap()
    }

    fn pull_request(action: &str, merged: bool, head: &str, base: &str) -> Event {
        let body = serde_json::json!({
            "action": action,
            "number": 7,
            "pull_request": {"merged": merged, "head": {"ref": head}, "base": {"ref": base}},
        });
        Event::parse("pull_request", body.to_string().as_bytes()).unwrap()
    }

    mod push_events {
        use super::*;

        #[test]
        fn ordinary_push_generates_entry() {
            let action = dispatcher().classify(&push("refs/heads/main", BEFORE, AFTER, "feat: x"));
            assert_eq!(
                action,
                Action::GenerateEntry {
                    before: Oid::new(BEFORE).unwrap(),
                    after: Oid::new(AFTER).unwrap(),
                }
            );
        }

        #[test]
        fn other_branches_ignored() {
            let action = dispatcher().classify(&push("refs/heads/dev", BEFORE, AFTER, "feat: x"));
            assert_eq!(
                action,
                Action::Ignore(IgnoreReason::UntrackedRef("refs/heads/dev".into()))
            );
        }

        #[test]
        fn tags_ignored() {
            let action = dispatcher().classify(&push("refs/tags/v1", BEFORE, AFTER, "feat: x"));
            assert!(matches!(action, Action::Ignore(IgnoreReason::UntrackedRef(_))));
        }

        #[test]
        fn creation_and_deletion_ignored() {
            let d = dispatcher();
            assert_eq!(
                d.classify(&push("refs/heads/main", ZERO, AFTER, "init")),
                Action::Ignore(IgnoreReason::BranchCreated)
            );
            assert_eq!(
                d.classify(&push("refs/heads/main", BEFORE, ZERO, "gone")),
                Action::Ignore(IgnoreReason::BranchDeleted)
            );
        }

        #[test]
        fn release_commit_ignored() {
            let action = dispatcher().classify(&push(
                "refs/heads/main",
                BEFORE,
                AFTER,
                "chore(changelog): release 2024-05-01",
            ));
            assert_eq!(action, Action::Ignore(IgnoreReason::AutomationCommit));
        }

        #[test]
        fn automation_merge_commit_ignored() {
            let action = dispatcher().classify(&push(
                "refs/heads/main",
                BEFORE,
                AFTER,
                "Merge pull request #7 from acme/changelog/2222222\n\nchore(changelog): update",
            ));
            assert_eq!(action, Action::Ignore(IgnoreReason::AutomationCommit));
        }

        #[test]
        fn human_merge_commit_generates_entry() {
            let action = dispatcher().classify(&push(
                "refs/heads/main",
                BEFORE,
                AFTER,
                "Merge pull request #8 from acme/feature/login",
            ));
            assert!(matches!(action, Action::GenerateEntry { .. }));
        }
    }

    mod pull_request_events {
        use super::*;

        #[test]
        fn merged_automation_pr_releases() {
            let action = dispatcher().classify(&pull_request("closed", true, "changelog/abc", "main"));
            assert_eq!(action, Action::Release { number: 7 });
        }

        #[test]
        fn closed_without_merge_ignored() {
            let action =
                dispatcher().classify(&pull_request("closed", false, "changelog/abc", "main"));
            assert_eq!(action, Action::Ignore(IgnoreReason::PullRequestNotMerged));
        }

        #[test]
        fn opened_ignored() {
            let action = dispatcher().classify(&pull_request("opened", false, "changelog/abc", "main"));
            assert_eq!(action, Action::Ignore(IgnoreReason::PullRequestNotMerged));
        }

        #[test]
        fn human_pr_ignored() {
            let action = dispatcher().classify(&pull_request("closed", true, "feature/x", "main"));
            assert_eq!(action, Action::Ignore(IgnoreReason::UntrackedPullRequest));
        }

        #[test]
        fn other_base_ignored() {
            let action = dispatcher().classify(&pull_request("closed", true, "changelog/abc", "dev"));
            assert_eq!(action, Action::Ignore(IgnoreReason::UntrackedPullRequest));
        }
    }

    #[test]
    fn ping_and_unknown() {
        let d = dispatcher();
        assert_eq!(d.classify(&Event::Ping), Action::Pong);
        assert_eq!(
            d.classify(&Event::Other("issues".into())),
            Action::Ignore(IgnoreReason::UnsupportedEvent("issues".into()))
        );
    }

    #[test]
    fn merged_branch_parsing() {
        assert_eq!(
            merged_branch("Merge pull request #12 from acme/changelog/abc"),
            Some("changelog/abc")
        );
        assert_eq!(merged_branch("Merge pull request # from acme/x"), None);
        assert_eq!(merged_branch("Merge branch 'x'"), None);
    }
}
