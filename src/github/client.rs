use super::*;
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, LINK, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

const PER_PAGE: &str = "100";
const MAX_ATTEMPTS: u32 = 3;
/// Rate-limit resets further away than this fail the repository instead of waiting.
const MAX_RATE_LIMIT_WAIT_SECS: u64 = 60;

/// GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

fn login(user: Option<User>) -> String {
    user.map(|u| u.login)
        .unwrap_or_else(|| GHOST_LOGIN.to_string())
}

#[derive(Debug, Deserialize)]
struct IssueJson {
    user: Option<User>,
    created_at: DateTime<Utc>,
    state: String,
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ReactionSummary {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct CommentJson {
    id: u64,
    user: Option<User>,
    body: Option<String>,
    created_at: DateTime<Utc>,
    reactions: Option<ReactionSummary>,
}

#[derive(Debug, Deserialize)]
struct ReactionJson {
    user: Option<User>,
    content: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestJson {
    user: Option<User>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PullRequestCommentJson {
    user: Option<User>,
    created_at: DateTime<Utc>,
}

impl From<IssueJson> for Issue {
    fn from(json: IssueJson) -> Self {
        Issue {
            author: login(json.user),
            created_at: json.created_at,
            state: json.state,
            is_pull_request: json.pull_request.is_some(),
        }
    }
}

impl From<PullRequestJson> for PullRequest {
    fn from(json: PullRequestJson) -> Self {
        PullRequest {
            author: login(json.user),
            created_at: json.created_at,
            updated_at: json.updated_at,
            merged: json.merged_at.is_some(),
            merged_at: json.merged_at,
        }
    }
}

impl From<PullRequestCommentJson> for PullRequestComment {
    fn from(json: PullRequestCommentJson) -> Self {
        PullRequestComment {
            author: login(json.user),
            created_at: json.created_at,
        }
    }
}

impl From<ReactionJson> for Reaction {
    fn from(json: ReactionJson) -> Self {
        Reaction {
            author: login(json.user),
            kind: json.content,
        }
    }
}

/// The `rel="next"` target of a `Link` header, if any.
pub fn parse_next_link(header: &str) -> Option<String> {
    let re = Regex::new(r#"<([^>]+)>;\s*rel="next""#).ok()?;
    re.captures(header)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

fn iso(since: DateTime<Utc>) -> String {
    since.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Map a non-success response onto a fault.
fn classify(status: StatusCode, headers: &HeaderMap) -> SourceFault {
    match status {
        StatusCode::UNAUTHORIZED => SourceFault::Unauthorized,
        StatusCode::NOT_FOUND => SourceFault::NotFound,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            if header_u64(headers, "x-ratelimit-remaining") == Some(0) {
                let reset_in_secs = header_u64(headers, "x-ratelimit-reset")
                    .map(|reset| reset.saturating_sub(Utc::now().timestamp().max(0) as u64))
                    .unwrap_or(3600);
                SourceFault::RateLimited { reset_in_secs }
            } else if let Some(retry_after) = header_u64(headers, RETRY_AFTER.as_str()) {
                SourceFault::RateLimited {
                    reset_in_secs: retry_after,
                }
            } else {
                SourceFault::Http(status.as_u16())
            }
        }
        other => SourceFault::Http(other.as_u16()),
    }
}

/// How long to wait before retrying after `fault`, or `None` to give up.
fn retry_delay(fault: &SourceFault, attempt: u32) -> Option<Duration> {
    if attempt + 1 >= MAX_ATTEMPTS {
        return None;
    }
    match fault {
        SourceFault::RateLimited { reset_in_secs } if *reset_in_secs <= MAX_RATE_LIMIT_WAIT_SECS => {
            Some(Duration::from_secs(reset_in_secs + 1))
        }
        fault if fault.is_transient() => Some(Duration::from_secs(1u64 << attempt)),
        _ => None,
    }
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("contributor-stats/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        if token.is_none() {
            warn!("No GitHub token given, unauthenticated requests are heavily rate limited");
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, SourceFault> {
        let mut params: Vec<(&str, String)> = query.to_vec();
        params.push(("per_page", PER_PAGE.to_string()));
        Url::parse_with_params(&format!("{}{}", self.base_url, path), &params)
            .map_err(|e| SourceFault::Decode(format!("invalid url: {}", e)))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &Url,
    ) -> Result<(Vec<T>, Option<String>), SourceFault> {
        let mut attempt = 0;
        loop {
            match self.try_get_page(url).await {
                Ok(page) => return Ok(page),
                Err(fault) => match retry_delay(&fault, attempt) {
                    Some(delay) => {
                        warn!("Request to {} failed ({}), retrying in {:?}", url, fault, delay);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(fault),
                },
            }
        }
    }

    async fn try_get_page<T: DeserializeOwned>(
        &self,
        url: &Url,
    ) -> Result<(Vec<T>, Option<String>), SourceFault> {
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceFault::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify(status, response.headers()));
        }

        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link);

        let items: Vec<T> = response
            .json()
            .await
            .map_err(|e| SourceFault::Decode(e.to_string()))?;

        Ok((items, next))
    }

    /// Follow pagination until exhausted or until `keep` rejects an item.
    /// The rejected item and everything after it are dropped.
    async fn fetch_all<T, F>(
        &self,
        path: &str,
        query: &[(&str, String)],
        mut keep: F,
    ) -> Result<Vec<T>, SourceFault>
    where
        T: DeserializeOwned,
        F: FnMut(&T) -> bool,
    {
        let mut url = self.url(path, query)?;
        let mut items = Vec::new();
        let mut pages = 0;

        loop {
            let (page, next) = self.get_page::<T>(&url).await?;
            pages += 1;
            for item in page {
                if !keep(&item) {
                    debug!("{}: stopped after {} pages", path, pages);
                    return Ok(items);
                }
                items.push(item);
            }
            match next {
                Some(next) => {
                    url = Url::parse(&next)
                        .map_err(|e| SourceFault::Decode(format!("invalid next link: {}", e)))?;
                }
                None => break,
            }
        }

        debug!("{}: {} items in {} pages", path, items.len(), pages);
        Ok(items)
    }

    async fn fetch_reactions(&self, repo: &str, comment_id: u64) -> Result<Vec<Reaction>, SourceFault> {
        let path = format!("/repos/{}/issues/comments/{}/reactions", repo, comment_id);
        let reactions: Vec<ReactionJson> = self.fetch_all(&path, &[], |_| true).await?;
        Ok(reactions.into_iter().map(Reaction::from).collect())
    }
}

impl ActivitySource for GitHubClient {
    async fn fetch_issues(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Issue>, SourceFault> {
        let path = format!("/repos/{}/issues", repo);
        let query = [("state", "all".to_string()), ("since", iso(since))];
        let issues: Vec<IssueJson> = self.fetch_all(&path, &query, |_| true).await?;
        info!("Fetched {} issues from {}", issues.len(), repo);
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    async fn fetch_comments(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Comment>, SourceFault> {
        let path = format!("/repos/{}/issues/comments", repo);
        let query = [("since", iso(since))];
        let raw: Vec<CommentJson> = self.fetch_all(&path, &query, |_| true).await?;

        let mut comments = Vec::with_capacity(raw.len());
        for comment in raw {
            let reacted = comment.reactions.as_ref().map_or(0, |r| r.total_count);
            // Only comments with reactions are worth a request each.
            let reactions = if reacted > 0 {
                self.fetch_reactions(repo, comment.id).await?
            } else {
                Vec::new()
            };
            comments.push(Comment {
                author: login(comment.user),
                body: comment.body.unwrap_or_default(),
                created_at: comment.created_at,
                reactions,
            });
        }

        info!("Fetched {} comments from {}", comments.len(), repo);
        Ok(comments)
    }

    async fn fetch_pull_requests(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>, SourceFault> {
        let path = format!("/repos/{}/pulls", repo);
        let query = [
            ("state", "all".to_string()),
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
        ];
        // Anything created or merged after `since` was also updated after it.
        let pulls: Vec<PullRequestJson> = self
            .fetch_all(&path, &query, |pr: &PullRequestJson| pr.updated_at >= since)
            .await?;
        info!("Fetched {} pull requests from {}", pulls.len(), repo);
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    async fn fetch_pull_request_comments(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PullRequestComment>, SourceFault> {
        let path = format!("/repos/{}/pulls/comments", repo);
        let query = [("since", iso(since))];
        let comments: Vec<PullRequestCommentJson> = self.fetch_all(&path, &query, |_| true).await?;
        info!("Fetched {} PR comments from {}", comments.len(), repo);
        Ok(comments.into_iter().map(PullRequestComment::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderValue;

    #[test]
    fn parses_next_link() {
        let header = r#"<https://api.github.com/repositories/1/issues?page=2>; rel="next", <https://api.github.com/repositories/1/issues?page=5>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/repositories/1/issues?page=2")
        );
        let last_page = r#"<https://api.github.com/repositories/1/issues?page=1>; rel="prev""#;
        assert_eq!(parse_next_link(last_page), None);
    }

    #[test]
    fn decodes_issue_and_detects_pull_requests() {
        let json = r#"[
            {"user": {"login": "ErikBjare"}, "created_at": "2023-02-01T10:00:00Z",
             "closed_at": null, "state": "open"},
            {"user": null, "created_at": "2023-02-02T10:00:00Z",
             "closed_at": "2023-02-03T10:00:00Z", "state": "closed",
             "pull_request": {"url": "https://api.github.com/repos/a/b/pulls/1"}}
        ]"#;
        let raw: Vec<IssueJson> = serde_json::from_str(json).unwrap();
        let issues: Vec<Issue> = raw.into_iter().map(Issue::from).collect();

        assert_eq!(issues[0].author, "ErikBjare");
        assert!(!issues[0].is_pull_request);
        assert_eq!(issues[1].author, GHOST_LOGIN);
        assert!(issues[1].is_pull_request);
        assert_eq!(issues[1].state, "closed");
    }

    #[test]
    fn decodes_pull_request_merge_state() {
        let json = r#"{"user": {"login": "xylix"}, "created_at": "2023-02-01T10:00:00Z",
            "updated_at": "2023-02-05T10:00:00Z", "merged_at": "2023-02-04T10:00:00Z"}"#;
        let pr: PullRequest = serde_json::from_str::<PullRequestJson>(json).unwrap().into();
        assert!(pr.merged);
        assert_eq!(pr.author, "xylix");
    }

    #[test]
    fn classifies_rate_limits() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, &headers),
            SourceFault::RateLimited { .. }
        ));

        let mut secondary = HeaderMap::new();
        secondary.insert(RETRY_AFTER, HeaderValue::from_static("5"));
        assert_eq!(
            classify(StatusCode::FORBIDDEN, &secondary),
            SourceFault::RateLimited { reset_in_secs: 5 }
        );

        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, &HeaderMap::new()),
            SourceFault::Unauthorized
        );
        assert_eq!(
            classify(StatusCode::BAD_GATEWAY, &HeaderMap::new()),
            SourceFault::Http(502)
        );
    }

    #[test]
    fn retries_only_transient_faults() {
        assert!(retry_delay(&SourceFault::Http(503), 0).is_some());
        assert!(retry_delay(&SourceFault::Http(503), MAX_ATTEMPTS - 1).is_none());
        assert!(retry_delay(&SourceFault::NotFound, 0).is_none());
        assert!(retry_delay(&SourceFault::RateLimited { reset_in_secs: 3600 }, 0).is_none());
        assert_eq!(
            retry_delay(&SourceFault::RateLimited { reset_in_secs: 2 }, 0),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn builds_paged_urls() {
        let client = GitHubClient::new("https://api.github.com/", Some("t".into())).unwrap();
        let url = client
            .url("/repos/ActivityWatch/aw-core/issues", &[("state", "all".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/ActivityWatch/aw-core/issues?state=all&per_page=100"
        );
    }
}
