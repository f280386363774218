use super::*;
use crate::error::StatsError;
use tracing::{debug, info};

/// One contributor row of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRow {
    pub key: ContributorKey,
    pub record: ContributorRecord,
}

/// Per-repository aggregate: one row per contributor, highest total first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTable {
    pub repo: String,
    pub since: NaiveDate,
    pub github: Option<RepoSummary>,
    pub rows: Vec<ContributorRow>,
}

impl RepoTable {
    #[cfg(test)]
    pub fn get(&self, key: &ContributorKey) -> Option<&ContributorRecord> {
        self.rows.iter().find(|row| &row.key == key).map(|row| &row.record)
    }

    pub fn records(&self) -> impl Iterator<Item = (&ContributorKey, &ContributorRecord)> {
        self.rows.iter().map(|row| (&row.key, &row.record))
    }
}

/// Combine one repository's collector output into contributor rows.
///
/// The issues endpoint lists pull requests too, so submitted pull requests
/// are subtracted from the raw issue count. A contributor with fewer raw
/// issues than pull requests means the inputs disagree, and the whole
/// repository is rejected rather than emitting a negative count.
pub fn aggregate(stats: &RepoStats) -> Result<RepoTable, StatsError> {
    let contributors = stats.contributors();
    let mut rows = Vec::with_capacity(contributors.len());

    for key in contributors {
        let issues_raw = stats.issues_raw.get(&key);
        let prs_submitted = stats.prs_submitted.get(&key);
        let issues = issues_raw
            .checked_sub(prs_submitted)
            .ok_or_else(|| StatsError::DataIntegrity {
                repo: stats.repo.clone(),
                contributor: key.to_string(),
                issues: issues_raw,
                pull_requests: prs_submitted,
            })?;

        let record = ContributorRecord {
            issues,
            comments: stats.comments.get(&key),
            comment_words: stats.comment_words.get(&key),
            reactions_given: stats.reactions_given.get(&key),
            reactions_received: stats.reactions_received.get(&key),
            prs_submitted,
            prs_merged: stats.prs_merged.get(&key),
            pr_comments: stats.pr_comments.get(&key),
            commits: stats.commits.get(&key),
            lines_added: stats.lines_added.get(&key),
            lines_removed: stats.lines_removed.get(&key),
            blame_lines: stats.blame_lines.get(&key),
            active_days: stats.active_days.get(&key),
        };
        debug!(
            "{}: {} total, {} active days",
            key,
            record.total(),
            record.active_day_count()
        );
        rows.push(ContributorRow { key, record });
    }

    // Stable sort keeps discovery order among equal totals.
    rows.sort_by(|a, b| b.record.total().cmp(&a.record.total()));

    info!(
        "Aggregated {}: {} contributors",
        stats.repo,
        rows.len()
    );

    Ok(RepoTable {
        repo: stats.repo.clone(),
        since: stats.since,
        github: stats.github,
        rows,
    })
}
