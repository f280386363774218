use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;

pub mod cached;
pub mod client;
pub mod collectors;

pub use cached::CachedSource;
pub use client::GitHubClient;

use crate::error::SourceFault;

/// GitHub shows deleted accounts as this user.
pub const GHOST_LOGIN: &str = "ghost";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub author: String,
    pub created_at: DateTime<Utc>,
    /// `open` or `closed`.
    pub state: String,
    /// The issues endpoint lists pull requests as issues too.
    pub is_pull_request: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub author: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub merged: bool,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestComment {
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Everything fetched for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoActivity {
    pub issues: Vec<Issue>,
    pub comments: Vec<Comment>,
    pub pull_requests: Vec<PullRequest>,
    pub pull_request_comments: Vec<PullRequestComment>,
}

/// Where issue, comment and pull-request activity comes from.
///
/// `repo` is a full `owner/name`. Implementations own their retry policy;
/// an `Err` means the repository's activity is unavailable for this run.
pub trait ActivitySource: Sync {
    fn fetch_issues(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Issue>, SourceFault>> + Send;

    fn fetch_comments(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Comment>, SourceFault>> + Send;

    fn fetch_pull_requests(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<PullRequest>, SourceFault>> + Send;

    fn fetch_pull_request_comments(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<PullRequestComment>, SourceFault>> + Send;

    /// All four listings of one repository, or the first fault.
    fn fetch_activity(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<RepoActivity, SourceFault>> + Send {
        async move {
            tracing::info!(" - Getting issues for {}...", repo);
            let issues = self.fetch_issues(repo, since).await?;
            tracing::info!(" - Getting comments for {}...", repo);
            let comments = self.fetch_comments(repo, since).await?;
            tracing::info!(" - Getting pull requests for {}...", repo);
            let pull_requests = self.fetch_pull_requests(repo, since).await?;
            tracing::info!(" - Getting PR comments for {}...", repo);
            let pull_request_comments = self.fetch_pull_request_comments(repo, since).await?;

            Ok(RepoActivity {
                issues,
                comments,
                pull_requests,
                pull_request_comments,
            })
        }
    }
}
