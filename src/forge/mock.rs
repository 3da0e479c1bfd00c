//! forge::mock
//!
//! In-memory forge for deterministic testing.
//!
//! Stores PRs in memory, records every call, and can be told to fail a
//! given operation.
//!
//! # Example
//!
//! ```
//! use doctrace::forge::mock::MockForge;
//! use doctrace::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//! let url = forge
//!     .open_request("changelog/abc1234", "Update changelog", "body", "main")
//!     .await
//!     .unwrap();
//! assert_eq!(url, "https://github.com/mock/repo/pull/1");
//!
//! // A second request for the same branch reuses the open PR.
//! let again = forge
//!     .open_request("changelog/abc1234", "Update changelog", "body", "main")
//!     .await
//!     .unwrap();
//! assert_eq!(again, url);
//! assert_eq!(forge.pr_count(), 1);
//! # });
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::traits::{CreatePrRequest, Forge, ForgeError, PrState, PullRequest};

/// Mock forge; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug, Default)]
struct MockForgeInner {
    prs: Vec<PullRequest>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// Which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    CreatePr(ForgeError),
    FindPrByHead(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CreatePr {
        head: String,
        base: String,
        title: String,
        body: Option<String>,
    },
    FindPrByHead {
        head: String,
    },
}

impl MockForge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    pub fn all_prs(&self) -> Vec<PullRequest> {
        self.lock().prs.clone()
    }

    pub fn pr_count(&self) -> usize {
        self.lock().prs.len()
    }

    /// Mark a PR merged, as if a reviewer had merged it.
    pub fn merge(&self, number: u64) {
        if let Some(pr) = self.lock().prs.iter_mut().find(|p| p.number == number) {
            pr.state = PrState::Merged;
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_fail(inner: &MockForgeInner, op: &MockOperation) -> Result<(), ForgeError> {
        match (&inner.fail_on, op) {
            (Some(FailOn::CreatePr(e)), MockOperation::CreatePr { .. })
            | (Some(FailOn::FindPrByHead(e)), MockOperation::FindPrByHead { .. }) => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        let mut inner = self.lock();
        let op = MockOperation::CreatePr {
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
            body: request.body.clone(),
        };
        inner.operations.push(op.clone());
        Self::check_fail(&inner, &op)?;

        let duplicate = inner
            .prs
            .iter()
            .any(|p| p.head == request.head && p.state == PrState::Open);
        if duplicate {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("A pull request already exists for {}", request.head),
            });
        }

        let number = inner.prs.iter().map(|p| p.number).max().unwrap_or(0) + 1;
        let pr = PullRequest {
            number,
            url: format!("https://github.com/mock/repo/pull/{number}"),
            state: PrState::Open,
            head: request.head,
            base: request.base,
            title: request.title,
        };
        inner.prs.push(pr.clone());
        Ok(pr)
    }

    async fn find_pr_by_head(&self, head: &str) -> Result<Option<PullRequest>, ForgeError> {
        let mut inner = self.lock();
        let op = MockOperation::FindPrByHead {
            head: head.to_string(),
        };
        inner.operations.push(op.clone());
        Self::check_fail(&inner, &op)?;

        Ok(inner
            .prs
            .iter()
            .find(|p| p.head == head && p.state == PrState::Open)
            .cloned())
    }
}
