//! Per-metric collectors over fetched GitHub activity.
//!
//! Each collector is a pure function of its inputs. Identities are
//! normalized on the way in; alias resolution happens later on the whole
//! `RepoStats`.

use super::*;
use crate::identity::Normalizer;
use crate::stats::{ActiveDaySet, MetricBag, RepoStats, RepoSummary};

pub const POSITIVE_REACTIONS: [&str; 4] = ["+1", "hooray", "heart", "rocket"];

pub fn is_positive_reaction(kind: &str) -> bool {
    POSITIVE_REACTIONS.contains(&kind)
}

/// Issues opened since the cutoff. Pull requests are included, as the
/// issues endpoint returns them.
pub fn issues_by_user(issues: &[Issue], since: DateTime<Utc>, names: &mut Normalizer) -> MetricBag {
    let mut bag = MetricBag::new();
    for issue in issues.iter().filter(|i| i.created_at >= since) {
        if let Some(key) = names.key(&issue.author) {
            bag.increment(key);
        }
    }
    bag
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentStats {
    pub count: MetricBag,
    pub words: MetricBag,
    pub days: ActiveDaySet,
    pub reactions_given: MetricBag,
    pub reactions_received: MetricBag,
}

/// Comments, words, comment days and positive reactions. Comments written
/// by bots are skipped entirely.
pub fn comment_stats(
    comments: &[Comment],
    since: DateTime<Utc>,
    bot_marker: &str,
    names: &mut Normalizer,
) -> CommentStats {
    let mut stats = CommentStats::default();
    for comment in comments.iter().filter(|c| c.created_at >= since) {
        let Some(author) = names.key(&comment.author) else {
            continue;
        };
        if author.is_bot(bot_marker) {
            continue;
        }

        stats.count.increment(author.clone());
        stats
            .words
            .add(author.clone(), comment.body.split_whitespace().count() as u64);
        stats.days.insert(author.clone(), comment.created_at.date_naive());

        for reaction in comment.reactions.iter().filter(|r| is_positive_reaction(&r.kind)) {
            if let Some(giver) = names.key(&reaction.author) {
                stats.reactions_given.increment(giver);
            }
            stats.reactions_received.increment(author.clone());
        }
    }
    stats
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestStats {
    pub submitted: MetricBag,
    pub merged: MetricBag,
}

/// Pull requests opened since the cutoff, and pull requests merged since it.
pub fn pull_request_stats(
    pulls: &[PullRequest],
    since: DateTime<Utc>,
    names: &mut Normalizer,
) -> PullRequestStats {
    let mut stats = PullRequestStats::default();
    for pr in pulls {
        let Some(author) = names.key(&pr.author) else {
            continue;
        };
        if pr.created_at >= since {
            stats.submitted.increment(author.clone());
        }
        if pr.merged && pr.merged_at.map_or(false, |at| at >= since) {
            stats.merged.increment(author);
        }
    }
    stats
}

pub fn pr_comments_by_user(
    comments: &[PullRequestComment],
    since: DateTime<Utc>,
    names: &mut Normalizer,
) -> MetricBag {
    let mut bag = MetricBag::new();
    for comment in comments.iter().filter(|c| c.created_at >= since) {
        if let Some(key) = names.key(&comment.author) {
            bag.increment(key);
        }
    }
    bag
}

/// Days on which issues or pull requests were opened, and pull requests merged.
pub fn active_days_by_user(
    issues: &[Issue],
    pulls: &[PullRequest],
    since: DateTime<Utc>,
    names: &mut Normalizer,
) -> ActiveDaySet {
    let mut days = ActiveDaySet::new();
    for issue in issues.iter().filter(|i| i.created_at >= since) {
        if let Some(key) = names.key(&issue.author) {
            days.insert(key, issue.created_at.date_naive());
        }
    }
    for pr in pulls {
        let Some(key) = names.key(&pr.author) else {
            continue;
        };
        if pr.created_at >= since {
            days.insert(key.clone(), pr.created_at.date_naive());
        }
        if let Some(merged_at) = pr.merged_at.filter(|at| pr.merged && *at >= since) {
            days.insert(key, merged_at.date_naive());
        }
    }
    days
}

/// Repository-wide counts of issues by state, and of pull requests, opened
/// since the cutoff. Bots count here; these are not per-contributor numbers.
pub fn repo_summary(issues: &[Issue], pulls: &[PullRequest], since: DateTime<Utc>) -> RepoSummary {
    let mut summary = RepoSummary::default();
    for issue in issues
        .iter()
        .filter(|i| i.created_at >= since && !i.is_pull_request)
    {
        if issue.state == "open" {
            summary.open_issues += 1;
        } else {
            summary.closed_issues += 1;
        }
    }
    summary.pull_requests = pulls.iter().filter(|pr| pr.created_at >= since).count() as u64;
    summary
}

/// Run every collector over `activity` and store the results in `stats`.
pub fn apply(
    activity: &RepoActivity,
    since: DateTime<Utc>,
    bot_marker: &str,
    names: &mut Normalizer,
    stats: &mut RepoStats,
) {
    stats.github = Some(repo_summary(&activity.issues, &activity.pull_requests, since));
    stats.issues_raw = issues_by_user(&activity.issues, since, names);

    let comments = comment_stats(&activity.comments, since, bot_marker, names);
    stats.comments = comments.count;
    stats.comment_words = comments.words;
    stats.reactions_given = comments.reactions_given;
    stats.reactions_received = comments.reactions_received;

    let pulls = pull_request_stats(&activity.pull_requests, since, names);
    stats.prs_submitted = pulls.submitted;
    stats.prs_merged = pulls.merged;

    stats.pr_comments = pr_comments_by_user(&activity.pull_request_comments, since, names);

    stats.active_days.union(active_days_by_user(
        &activity.issues,
        &activity.pull_requests,
        since,
        names,
    ));
    stats.active_days.union(comments.days);
}
