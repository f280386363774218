use super::*;

/// Filtering and ordering applied when a table is turned into rows for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Identities ending with this marker are hidden.
    pub bot_marker: String,
    /// Rows with `total <= min_total` are hidden.
    pub min_total: Option<u64>,
    pub ascending: bool,
    /// Keep only the highest-ranked rows.
    pub max_rows: Option<usize>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            bot_marker: "[bot]".to_string(),
            min_total: None,
            ascending: false,
            max_rows: None,
        }
    }
}

/// How rows are ordered and filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// By total, hiding rows at or below `min_total`.
    Total,
    /// Without GitHub activity every total is zero, so rank by git history:
    /// active days, commits and lines added. Nobody is hidden by threshold.
    GitHistory,
}

impl Ranking {
    pub fn for_summary(github: Option<RepoSummary>) -> Self {
        if github.is_some() {
            Ranking::Total
        } else {
            Ranking::GitHistory
        }
    }
}

/// Display-only view of one contributor: day sets become counts and blame
/// lines get their share of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub name: String,
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
    pub blame_percent: f64,
    pub active_days: usize,
    pub total: u64,
}

impl DisplayRow {
    fn new(key: &ContributorKey, record: &ContributorRecord, blame_total: u64) -> Self {
        let blame_percent = if blame_total == 0 {
            0.0
        } else {
            record.blame_lines as f64 / blame_total as f64 * 100.0
        };
        Self {
            name: key.to_string(),
            issues: record.issues,
            comments: record.comments,
            comment_words: record.comment_words,
            reactions_given: record.reactions_given,
            reactions_received: record.reactions_received,
            prs_submitted: record.prs_submitted,
            prs_merged: record.prs_merged,
            pr_comments: record.pr_comments,
            commits: record.commits,
            lines_added: record.lines_added,
            lines_removed: record.lines_removed,
            blame_lines: record.blame_lines,
            blame_percent,
            active_days: record.active_day_count(),
            total: record.total(),
        }
    }
}

/// Pure projection of contributor records into display rows.
///
/// Blame percentages are relative to every record passed in, filtered or not.
pub fn project<'a, I>(records: I, ranking: Ranking, options: &DisplayOptions) -> Vec<DisplayRow>
where
    I: IntoIterator<Item = (&'a ContributorKey, &'a ContributorRecord)>,
{
    let records: Vec<_> = records.into_iter().collect();
    let blame_total: u64 = records.iter().map(|(_, r)| r.blame_lines).sum();

    let mut rows: Vec<DisplayRow> = records
        .into_iter()
        .filter(|(key, _)| !key.is_bot(&options.bot_marker))
        .filter(|(_, record)| match (ranking, options.min_total) {
            (Ranking::Total, Some(min)) => record.total() > min,
            _ => true,
        })
        .map(|(key, record)| DisplayRow::new(key, record, blame_total))
        .collect();

    match ranking {
        Ranking::Total => {
            rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)))
        }
        Ranking::GitHistory => rows.sort_by(|a, b| {
            b.active_days
                .cmp(&a.active_days)
                .then_with(|| b.commits.cmp(&a.commits))
                .then_with(|| b.lines_added.cmp(&a.lines_added))
                .then_with(|| a.name.cmp(&b.name))
        }),
    }
    if let Some(max_rows) = options.max_rows {
        rows.truncate(max_rows);
    }
    if options.ascending {
        rows.reverse();
    }
    rows
}

impl RepoTable {
    pub fn display(&self, options: &DisplayOptions) -> Vec<DisplayRow> {
        project(self.records(), Ranking::for_summary(self.github), options)
    }
}

impl AggregateTable {
    pub fn display(&self, options: &DisplayOptions) -> Vec<DisplayRow> {
        project(
            self.records.iter(),
            Ranking::for_summary(self.github),
            options,
        )
    }
}
