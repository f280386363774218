use thiserror::Error;

/// Why a data source could not deliver a repository's activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceFault {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited, resets in {reset_in_secs}s")]
    RateLimited { reset_in_secs: u64 },

    #[error("unauthorized (check GITHUB_TOKEN)")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("unexpected HTTP status {0}")]
    Http(u16),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl SourceFault {
    /// Faults worth another attempt before giving up on a repository.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceFault::Network(_) => true,
            SourceFault::Http(status) => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(
        "data integrity fault in {repo}: {contributor} opened {issues} issues \
         but submitted {pull_requests} pull requests"
    )]
    DataIntegrity {
        repo: String,
        contributor: String,
        issues: u64,
        pull_requests: u64,
    },

    #[error("source unavailable for {repo}: {fault}")]
    SourceUnavailable { repo: String, fault: SourceFault },

    #[error("malformed identity {raw:?}")]
    MalformedIdentity { raw: String },

    #[error("git error in {repo}: {source}")]
    Git {
        repo: String,
        #[source]
        source: git2::Error,
    },

    #[error("invalid alias table: {0}")]
    InvalidAliasTable(String),
}

impl StatsError {
    pub fn git(repo: &str, source: git2::Error) -> Self {
        StatsError::Git {
            repo: repo.to_string(),
            source,
        }
    }
}
