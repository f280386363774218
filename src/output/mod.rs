use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod console;
pub mod html;
pub mod reporter;

pub use reporter::Reporter;

use crate::git::links::repository_url;
use crate::stats::{AggregateTable, DisplayOptions, DisplayRow, MissingRepo, RepoSummary, RepoTable};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Html,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Html,
        }
    }
}

/// Display rows of one repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoReport {
    pub name: String,
    pub url: Option<String>,
    /// Issue and pull request counts; `None` for git-only repositories.
    pub summary: Option<RepoSummary>,
    pub rows: Vec<DisplayRow>,
}

/// Everything a run reports: per-repository tables, the merged total and the
/// repositories that could not be included.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub since: NaiveDate,
    pub summary: Option<RepoSummary>,
    pub total: Vec<DisplayRow>,
    pub repos: Vec<RepoReport>,
    pub missing: Vec<MissingRepo>,
}

impl Report {
    /// `tables` pairs each repository table with its GitHub `owner/name`, if any.
    pub fn new(
        since: NaiveDate,
        aggregate: &AggregateTable,
        tables: &[(RepoTable, Option<String>)],
        options: &DisplayOptions,
    ) -> Self {
        Self {
            since,
            summary: aggregate.github,
            total: aggregate.display(options),
            repos: tables
                .iter()
                .map(|(table, github)| RepoReport {
                    name: table.repo.clone(),
                    url: github.as_deref().map(repository_url),
                    summary: table.github,
                    rows: table.display(options),
                })
                .collect(),
            missing: aggregate.missing.clone(),
        }
    }
}

pub trait OutputGenerator {
    async fn generate(&mut self, report: &Report) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::stats::{aggregate, merge_tables, ContributorKey, RepoStats, RepoSummary};

    pub fn report() -> Report {
        let since = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut stats = RepoStats::new("aw-core", since);
        stats.github = Some(RepoSummary {
            open_issues: 3,
            closed_issues: 5,
            pull_requests: 4,
        });
        let erik = ContributorKey::from("Erik Bjäreholt");
        stats.issues_raw.add(erik.clone(), 14);
        stats.comments.add(erik.clone(), 30);
        stats.prs_submitted.add(erik.clone(), 4);
        stats.blame_lines.add(erik.clone(), 300);
        stats.issues_raw.add(ContributorKey::from("xylix"), 12);
        stats.blame_lines.add(ContributorKey::from("xylix"), 100);
        stats.comments.add(ContributorKey::from("github-actions[bot]"), 50);
        stats
            .active_days
            .insert(erik, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());

        let table = aggregate(&stats).unwrap();
        let mut total = merge_tables(std::slice::from_ref(&table));
        total.mark_missing("aw-qt", "rate limited");

        let options = DisplayOptions {
            min_total: Some(10),
            ..DisplayOptions::default()
        };
        Report::new(
            since,
            &total,
            &[(table, Some("ActivityWatch/aw-core".to_string()))],
            &options,
        )
    }
}
