use super::*;
use crate::error::StatsError;
use tracing::{info, warn};

/// A repository that produced no table in this run, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRepo {
    pub repo: String,
    pub reason: String,
}

/// All repositories folded into one table. Day sets are kept intact so the
/// table can take further folds; counts only appear in display projections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateTable {
    pub repos: Vec<String>,
    pub missing: Vec<MissingRepo>,
    /// Summed over the repositories that had GitHub activity.
    pub github: Option<RepoSummary>,
    pub records: BTreeMap<ContributorKey, ContributorRecord>,
}

impl AggregateTable {
    pub fn from_table(table: &RepoTable) -> Self {
        Self {
            repos: vec![table.repo.clone()],
            missing: Vec::new(),
            github: table.github,
            records: table
                .records()
                .map(|(key, record)| (key.clone(), record.clone()))
                .collect(),
        }
    }

    /// Add one repository's rows contributor-wise.
    pub fn fold(&mut self, table: &RepoTable) {
        for (key, record) in table.records() {
            self.records
                .entry(key.clone())
                .or_default()
                .merge(record.clone());
        }
        self.github.merge(table.github);
        self.repos.push(table.repo.clone());
    }

    #[cfg(test)]
    pub fn get(&self, key: &ContributorKey) -> Option<&ContributorRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn mark_missing(&mut self, repo: &str, reason: impl Into<String>) {
        self.missing.push(MissingRepo {
            repo: repo.to_string(),
            reason: reason.into(),
        });
    }
}

/// Fold per-repository tables, in the given order, into one aggregate.
/// The input tables are left untouched.
pub fn merge_tables(tables: &[RepoTable]) -> AggregateTable {
    let Some((first, rest)) = tables.split_first() else {
        return AggregateTable::default();
    };

    let mut merged = AggregateTable::from_table(first);
    for table in rest {
        merged.fold(table);
    }

    info!(
        "Merged {} repositories into {} contributors",
        merged.repos.len(),
        merged.len()
    );
    merged
}

/// Resolve aliases in and aggregate every collected repository, then fold
/// the tables that came out. A repository that failed collection or
/// aggregation is marked missing; the others are unaffected.
///
/// `results` pairs each configured repository name with its collection
/// result, in configured order.
pub fn build_aggregate(
    results: Vec<(String, Result<RepoStats, StatsError>)>,
    aliases: &AliasTable,
) -> (AggregateTable, Vec<RepoTable>) {
    let mut tables = Vec::new();
    let mut missing = Vec::new();
    for (repo, result) in results {
        let table = result.and_then(|mut stats| {
            stats.resolve_aliases(aliases);
            aggregate(&stats)
        });
        match table {
            Ok(table) => tables.push(table),
            Err(e) => {
                warn!("Leaving {} out of the report: {}", repo, e);
                missing.push((repo, e.to_string()));
            }
        }
    }

    let mut total = merge_tables(&tables);
    for (repo, reason) in missing {
        total.mark_missing(&repo, reason);
    }
    (total, tables)
}
