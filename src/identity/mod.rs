//! Contributor identity normalization and alias collapsing.
//!
//! Raw identities come from two worlds: GitHub logins (`johan-bjareholt`) and
//! git author names (`Johan Bjäreholt`). Both are NFKC-normalized, since the
//! same visible name can arrive in composed or decomposed form, and then
//! collapsed through a fixed alias table.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::error::StatsError;
use crate::stats::{ContributorKey, Merge};

/// NFKC-normalize a raw identity into a contributor key. Whitespace is
/// kept as is; an identity made of nothing else is malformed.
pub fn normalize(raw: &str) -> Result<ContributorKey, StatsError> {
    let normalized: String = raw.nfkc().collect();
    if normalized.trim().is_empty() {
        return Err(StatsError::MalformedIdentity {
            raw: raw.to_string(),
        });
    }
    if normalized != raw {
        info!("Name '{}' was normalized to '{}'", raw, normalized);
    }
    Ok(ContributorKey::new_unchecked(normalized))
}

/// Memoizing front of [`normalize`] used by collectors, so every distinct raw
/// identity is normalized (and logged) once per run.
#[derive(Debug, Default)]
pub struct Normalizer {
    seen: HashMap<String, Option<ContributorKey>>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key for `raw`, or `None` when the identity is malformed.
    pub fn key(&mut self, raw: &str) -> Option<ContributorKey> {
        if let Some(known) = self.seen.get(raw) {
            return known.clone();
        }
        let key = match normalize(raw) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Skipping contributor: {}", e);
                None
            }
        };
        self.seen.insert(raw.to_string(), key.clone());
        key
    }
}

/// One canonical identity and the names that should be folded into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub canonical: String,
    pub aliases: Vec<String>,
}

impl AliasEntry {
    pub fn new(canonical: &str, aliases: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Known duplicate identities of the ActivityWatch contributors.
pub fn default_aliases() -> Vec<AliasEntry> {
    vec![
        AliasEntry::new("Erik Bjäreholt", &["Erik BjÃ¤reholt", "Erik Bjareholt"]),
        AliasEntry::new("Johan Bjäreholt", &["johan-bjareholt"]),
        AliasEntry::new("Nikana", &["nikanar"]),
        AliasEntry::new("Johannes Ahnlide", &["ahnlabb"]),
        AliasEntry::new(
            "Nicolae Stroncea",
            &["nicolae-stroncea", "Nicolae", "nicolae"],
        ),
        AliasEntry::new("Bill Ang Li", &["Bill-linux"]),
        AliasEntry::new("dependabot[bot]", &["dependabot-preview[bot]"]),
        AliasEntry::new("Otto-AA", &["A_A"]),
        AliasEntry::new("Brayo", &["brayo"]),
    ]
}

#[derive(Debug, Clone)]
struct ResolvedEntry {
    canonical: ContributorKey,
    aliases: Vec<ContributorKey>,
}

/// Validated alias table, applied in entry order.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<ResolvedEntry>,
}

impl AliasTable {
    /// Normalize and validate the configured entries.
    ///
    /// Rejected: empty names, an alias listed twice, and an alias that is
    /// also a canonical name (which would make the result depend on order).
    pub fn new(entries: &[AliasEntry]) -> Result<Self, StatsError> {
        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            let canonical = normalize(&entry.canonical)
                .map_err(|e| StatsError::InvalidAliasTable(e.to_string()))?;
            let aliases = entry
                .aliases
                .iter()
                .map(|alias| normalize(alias))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StatsError::InvalidAliasTable(e.to_string()))?;
            resolved.push(ResolvedEntry { canonical, aliases });
        }

        let canonicals: HashSet<&ContributorKey> = resolved.iter().map(|e| &e.canonical).collect();
        let mut aliases_seen = HashSet::new();
        for entry in &resolved {
            for alias in &entry.aliases {
                if canonicals.contains(alias) {
                    return Err(StatsError::InvalidAliasTable(format!(
                        "'{}' is both an alias and a canonical name",
                        alias
                    )));
                }
                if !aliases_seen.insert(alias) {
                    return Err(StatsError::InvalidAliasTable(format!(
                        "alias '{}' is listed more than once",
                        alias
                    )));
                }
            }
        }

        debug!("Loaded alias table with {} entries", resolved.len());
        Ok(Self { entries: resolved })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The canonical name for `key`, or `key` itself when it is not an alias.
    #[cfg(test)]
    pub fn canonical<'a>(&'a self, key: &'a ContributorKey) -> &'a ContributorKey {
        self.entries
            .iter()
            .find(|entry| entry.aliases.contains(key))
            .map_or(key, |entry| &entry.canonical)
    }

    /// Fold every aliased entry of `map` into its canonical entry.
    ///
    /// One pass in table order: an alias whose canonical entry already exists
    /// is merged into it, otherwise it is renamed to the canonical name.
    pub fn resolve<V: Merge>(&self, map: &mut BTreeMap<ContributorKey, V>) {
        for entry in &self.entries {
            for alias in &entry.aliases {
                let Some(aliased) = map.remove(alias) else {
                    continue;
                };
                match map.remove(&entry.canonical) {
                    Some(existing) => {
                        debug!("Merging '{}' into '{}'", alias, entry.canonical);
                        map.insert(entry.canonical.clone(), existing.merged(aliased));
                    }
                    None => {
                        debug!("Renaming '{}' to '{}'", alias, entry.canonical);
                        map.insert(entry.canonical.clone(), aliased);
                    }
                }
            }
        }
    }
}
