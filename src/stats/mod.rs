use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub mod aggregate;
pub mod display;
pub mod merge;

#[cfg(test)]
mod tests;

pub use aggregate::{aggregate, RepoTable};
pub use display::{DisplayOptions, DisplayRow};
pub use merge::{build_aggregate, merge_tables, AggregateTable, MissingRepo};

use crate::identity::AliasTable;

/// Canonical identity of one contributor after normalization and alias resolution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContributorKey(String);

impl ContributorKey {
    pub(crate) fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_bot(&self, marker: &str) -> bool {
        !marker.is_empty() && self.0.ends_with(marker)
    }
}

impl fmt::Display for ContributorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
impl From<&str> for ContributorKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Folding of two values that describe the same contributor.
///
/// Implementations must be commutative and insensitive to grouping, so any
/// fold order over the same values yields the same result.
pub trait Merge {
    fn merge(&mut self, other: Self);

    fn merged(mut self, other: Self) -> Self
    where
        Self: Sized,
    {
        self.merge(other);
        self
    }
}

impl Merge for u64 {
    fn merge(&mut self, other: Self) {
        *self += other;
    }
}

impl Merge for BTreeSet<NaiveDate> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

/// Per-contributor counter. Absent contributors count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricBag(BTreeMap<ContributorKey, u64>);

impl MetricBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ContributorKey) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn add(&mut self, key: ContributorKey, amount: u64) {
        *self.0.entry(key).or_insert(0) += amount;
    }

    pub fn increment(&mut self, key: ContributorKey) {
        self.add(key, 1);
    }

    pub fn keys(&self) -> impl Iterator<Item = &ContributorKey> {
        self.0.keys()
    }

    pub fn resolve_aliases(&mut self, aliases: &AliasTable) {
        aliases.resolve(&mut self.0);
    }
}

impl FromIterator<(ContributorKey, u64)> for MetricBag {
    fn from_iter<I: IntoIterator<Item = (ContributorKey, u64)>>(iter: I) -> Self {
        let mut bag = MetricBag::new();
        for (key, amount) in iter {
            bag.add(key, amount);
        }
        bag
    }
}

/// Calendar days on which each contributor was active. Absent contributors
/// have no active days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveDaySet(BTreeMap<ContributorKey, BTreeSet<NaiveDate>>);

impl ActiveDaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ContributorKey) -> BTreeSet<NaiveDate> {
        self.0.get(key).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub fn count(&self, key: &ContributorKey) -> usize {
        self.0.get(key).map_or(0, BTreeSet::len)
    }

    pub fn insert(&mut self, key: ContributorKey, day: NaiveDate) {
        self.0.entry(key).or_default().insert(day);
    }

    pub fn keys(&self) -> impl Iterator<Item = &ContributorKey> {
        self.0.keys()
    }

    pub fn union(&mut self, other: ActiveDaySet) {
        for (key, days) in other.0 {
            self.0.entry(key).or_default().merge(days);
        }
    }

    pub fn resolve_aliases(&mut self, aliases: &AliasTable) {
        aliases.resolve(&mut self.0);
    }
}

/// Everything known about one contributor in one repository, or summed
/// across repositories. `issues` is the net count, pull requests excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRecord {
    pub issues: u64,
    pub comments: u64,
    pub comment_words: u64,
    pub reactions_given: u64,
    pub reactions_received: u64,
    pub prs_submitted: u64,
    pub prs_merged: u64,
    pub pr_comments: u64,
    pub commits: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub blame_lines: u64,
    pub active_days: BTreeSet<NaiveDate>,
}

impl ContributorRecord {
    /// Ranking score, always recomputed from the additive fields.
    pub fn total(&self) -> u64 {
        self.issues + self.comments + self.prs_submitted + self.prs_merged + self.pr_comments
    }

    pub fn active_day_count(&self) -> usize {
        self.active_days.len()
    }
}

impl Merge for ContributorRecord {
    fn merge(&mut self, other: Self) {
        self.issues += other.issues;
        self.comments += other.comments;
        self.comment_words += other.comment_words;
        self.reactions_given += other.reactions_given;
        self.reactions_received += other.reactions_received;
        self.prs_submitted += other.prs_submitted;
        self.prs_merged += other.prs_merged;
        self.pr_comments += other.pr_comments;
        self.commits += other.commits;
        self.lines_added += other.lines_added;
        self.lines_removed += other.lines_removed;
        self.blame_lines += other.blame_lines;
        self.active_days.merge(other.active_days);
    }
}

/// Repository-wide GitHub counts since the cutoff. Pull requests listed by
/// the issues endpoint are not counted as issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub open_issues: u64,
    pub closed_issues: u64,
    pub pull_requests: u64,
}

impl Merge for RepoSummary {
    fn merge(&mut self, other: Self) {
        self.open_issues += other.open_issues;
        self.closed_issues += other.closed_issues;
        self.pull_requests += other.pull_requests;
    }
}

impl Merge for Option<RepoSummary> {
    fn merge(&mut self, other: Self) {
        let Some(other) = other else {
            return;
        };
        match self {
            Some(summary) => summary.merge(other),
            None => *self = Some(other),
        }
    }
}

/// Raw collector output for one repository, keyed by the `since` cutoff it
/// was collected with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoStats {
    pub repo: String,
    pub since: NaiveDate,
    /// `None` when no GitHub activity was collected.
    pub github: Option<RepoSummary>,
    /// Issues opened; the issues endpoint also lists pull requests.
    pub issues_raw: MetricBag,
    pub comments: MetricBag,
    pub comment_words: MetricBag,
    pub reactions_given: MetricBag,
    pub reactions_received: MetricBag,
    pub prs_submitted: MetricBag,
    pub prs_merged: MetricBag,
    pub pr_comments: MetricBag,
    pub commits: MetricBag,
    pub lines_added: MetricBag,
    pub lines_removed: MetricBag,
    pub blame_lines: MetricBag,
    pub active_days: ActiveDaySet,
}

impl RepoStats {
    pub fn new(repo: &str, since: NaiveDate) -> Self {
        Self {
            repo: repo.to_string(),
            since,
            github: None,
            issues_raw: MetricBag::new(),
            comments: MetricBag::new(),
            comment_words: MetricBag::new(),
            reactions_given: MetricBag::new(),
            reactions_received: MetricBag::new(),
            prs_submitted: MetricBag::new(),
            prs_merged: MetricBag::new(),
            pr_comments: MetricBag::new(),
            commits: MetricBag::new(),
            lines_added: MetricBag::new(),
            lines_removed: MetricBag::new(),
            blame_lines: MetricBag::new(),
            active_days: ActiveDaySet::new(),
        }
    }

    fn bags(&self) -> [&MetricBag; 12] {
        [
            &self.issues_raw,
            &self.comments,
            &self.comment_words,
            &self.reactions_given,
            &self.reactions_received,
            &self.prs_submitted,
            &self.prs_merged,
            &self.pr_comments,
            &self.commits,
            &self.lines_added,
            &self.lines_removed,
            &self.blame_lines,
        ]
    }

    fn bags_mut(&mut self) -> [&mut MetricBag; 12] {
        [
            &mut self.issues_raw,
            &mut self.comments,
            &mut self.comment_words,
            &mut self.reactions_given,
            &mut self.reactions_received,
            &mut self.prs_submitted,
            &mut self.prs_merged,
            &mut self.pr_comments,
            &mut self.commits,
            &mut self.lines_added,
            &mut self.lines_removed,
            &mut self.blame_lines,
        ]
    }

    /// Collapse aliased identities in every bag and the day set. Must run
    /// before aggregation reads any counts.
    pub fn resolve_aliases(&mut self, aliases: &AliasTable) {
        for bag in self.bags_mut() {
            bag.resolve_aliases(aliases);
        }
        self.active_days.resolve_aliases(aliases);
    }

    /// Every contributor seen in this repository, in discovery order.
    pub fn contributors(&self) -> Vec<ContributorKey> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let keys = self
            .bags()
            .into_iter()
            .flat_map(|bag| bag.keys())
            .chain(self.active_days.keys());
        for key in keys {
            if seen.insert(key) {
                order.push(key.clone());
            }
        }
        order
    }
}
