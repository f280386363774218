use super::*;
use crate::cache::DiskCache;
use std::sync::Arc;

/// An [`ActivitySource`] that memoizes whole repository snapshots in a
/// [`DiskCache`], keyed by repository and cutoff.
///
/// Only complete [`RepoActivity`] values are stored, so a run that fails
/// halfway leaves nothing behind. Single listings always go to the inner
/// source.
#[derive(Clone)]
pub struct CachedSource<S> {
    inner: S,
    cache: Arc<DiskCache>,
}

impl<S> CachedSource<S> {
    pub fn new(inner: S, cache: Arc<DiskCache>) -> Self {
        Self { inner, cache }
    }
}

impl<S: ActivitySource> ActivitySource for CachedSource<S> {
    fn fetch_issues(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Issue>, SourceFault>> + Send {
        self.inner.fetch_issues(repo, since)
    }

    fn fetch_comments(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Comment>, SourceFault>> + Send {
        self.inner.fetch_comments(repo, since)
    }

    fn fetch_pull_requests(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<PullRequest>, SourceFault>> + Send {
        self.inner.fetch_pull_requests(repo, since)
    }

    fn fetch_pull_request_comments(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<PullRequestComment>, SourceFault>> + Send {
        self.inner.fetch_pull_request_comments(repo, since)
    }

    async fn fetch_activity(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<RepoActivity, SourceFault> {
        let args = (repo.to_string(), since.to_rfc3339());
        self.cache
            .get_or_compute("activity", &args, || self.inner.fetch_activity(repo, since))
            .await
    }
}
