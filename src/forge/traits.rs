//! forge::traits
//!
//! The review-request collaborator.
//!
//! Opening a pull request is the last step of the entry pipeline. The trait
//! is async because it talks to a remote API; implementations must be
//! `Send + Sync` so the server can share one behind an `Arc`.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from forge operations.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// No token is configured.
    #[error("authentication required")]
    AuthRequired,

    /// The token is invalid, expired, or lacks permissions.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Network or connection error, including timeouts.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Request to create a pull request.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    /// Branch with the changes
    pub head: String,
    /// Branch to merge into
    pub base: String,
    pub title: String,
    pub body: Option<String>,
    pub draft: bool,
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    /// Web URL for viewing
    pub url: String,
    pub state: PrState,
    pub head: String,
    pub base: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

/// A remote hosting service that accepts review requests.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Forge name, for logs.
    fn name(&self) -> &'static str;

    /// Create a new pull request.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` if no authentication is configured
    /// - `ApiError` with status 422 if validation fails (e.g. head doesn't exist)
    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError>;

    /// The open pull request whose head is `head`, if any.
    async fn find_pr_by_head(&self, head: &str) -> Result<Option<PullRequest>, ForgeError>;

    /// Open a review request for `branch` against `base` and return its URL.
    ///
    /// Reuses an already open request for the same branch, so a redelivered
    /// push that force-updates the branch does not open a duplicate.
    async fn open_request(
        &self,
        branch: &str,
        title: &str,
        body: &str,
        base: &str,
    ) -> Result<String, ForgeError> {
        if let Some(existing) = self.find_pr_by_head(branch).await? {
            return Ok(existing.url);
        }
        let pr = self
            .create_pr(CreatePrRequest {
                head: branch.to_string(),
                base: base.to_string(),
                title: title.to_string(),
                body: Some(body.to_string()),
                draft: false,
            })
            .await?;
        Ok(pr.url)
    }
}
