use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub mod analyzer;
pub mod links;

pub use analyzer::GitAnalyzer;
pub use links::RepositoryLinker;

use crate::identity::Normalizer;
use crate::stats::RepoStats;

/// Authorship statistics of a local clone, keyed by raw author name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitActivity {
    pub commits: BTreeMap<String, u64>,
    pub lines_added: BTreeMap<String, u64>,
    pub lines_removed: BTreeMap<String, u64>,
    pub commit_days: BTreeMap<String, BTreeSet<NaiveDate>>,
    /// Lines at HEAD last touched by each author.
    pub blame_lines: BTreeMap<String, u64>,
}

impl GitActivity {
    /// Normalize author names and add everything to `stats`.
    pub fn apply_to(&self, stats: &mut RepoStats, names: &mut Normalizer) {
        let bags = [
            (&self.commits, &mut stats.commits),
            (&self.lines_added, &mut stats.lines_added),
            (&self.lines_removed, &mut stats.lines_removed),
            (&self.blame_lines, &mut stats.blame_lines),
        ];
        for (source, bag) in bags {
            for (author, count) in source {
                if let Some(key) = names.key(author) {
                    bag.add(key, *count);
                }
            }
        }

        for (author, days) in &self.commit_days {
            if let Some(key) = names.key(author) {
                for day in days {
                    stats.active_days.insert(key.clone(), *day);
                }
            }
        }
    }
}
