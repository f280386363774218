use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::git::{GitAnalyzer, RepositoryLinker};
use crate::identity::{default_aliases, AliasEntry, AliasTable};
use crate::output::reporter::{COMBINED_PAGE, TOTAL_PAGE};
use crate::output::OutputFormat;
use crate::stats::DisplayOptions;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "contributor-stats.toml";
pub const ENV_PREFIX: &str = "CONTRIB_STATS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub collection: CollectionConfig,
    pub identity: IdentityConfig,
    pub report: ReportConfig,
    pub repos: Vec<RepoSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub since: NaiveDate,
    pub api_base_url: String,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
    /// Repositories collected at the same time.
    pub concurrency: usize,
    pub github: bool,
    pub blame: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub bot_marker: String,
    pub aliases: Vec<AliasEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Contributors need a total above this to be listed.
    pub min_total: Option<u64>,
    pub ascending: bool,
    pub max_rows: Option<usize>,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

/// One repository to collect. `github` is the `owner/name` used against the
/// API; `path` a local clone for commit and blame statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSpec {
    pub name: String,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl RepoSpec {
    pub fn github(owner: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            github: Some(format!("{}/{}", owner, name)),
            path: None,
        }
    }

    /// A local clone, named after its directory. The GitHub name is taken
    /// from the clone's remote when it points at github.com.
    pub fn from_clone(path: &Path) -> Result<Self> {
        let analyzer = GitAnalyzer::new(path)
            .with_context(|| format!("{} is not a git repository", path.display()))?;
        let github = analyzer
            .detect_remote_url()
            .and_then(|url| RepositoryLinker::new(&url).github_full_name());

        let name = match &github {
            Some(full_name) => full_name.rsplit('/').next().unwrap_or(full_name).to_string(),
            None => path
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
                .unwrap_or_else(|| path.display().to_string()),
        };
        debug!("Found repository {} at {}", name, path.display());

        Ok(Self {
            name,
            github,
            path: Some(path.to_path_buf()),
        })
    }
}

/// Git clones directly below `dir`, or one level further down (for layouts
/// like `repos/ActivityWatch/aw-core`), sorted by path.
pub fn discover_clones(dir: &Path) -> Result<Vec<PathBuf>> {
    fn subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    let mut clones = Vec::new();
    for child in subdirs(dir)? {
        if child.join(".git").exists() {
            clones.push(child);
            continue;
        }
        for grandchild in subdirs(&child)? {
            if grandchild.join(".git").exists() {
                clones.push(grandchild);
            }
        }
    }
    Ok(clones)
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            since: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            api_base_url: "https://api.github.com".to_string(),
            cache_dir: PathBuf::from(".cache/github-stats"),
            use_cache: true,
            concurrency: 4,
            github: true,
            blame: true,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            bot_marker: "[bot]".to_string(),
            aliases: default_aliases(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            min_total: Some(10),
            ascending: true,
            max_rows: None,
            output_dir: PathBuf::from("tables"),
            format: OutputFormat::Html,
        }
    }
}

pub fn default_repos() -> Vec<RepoSpec> {
    [
        "activitywatch",
        "activitywatch-old",
        "docs",
        "aw-core",
        "aw-client",
        "aw-client-js",
        "aw-server",
        "aw-server-rust",
        "aw-watcher-window",
        "aw-watcher-afk",
        "aw-watcher-input",
        "aw-webui",
        "aw-qt",
        "activitywatch.github.io",
    ]
    .iter()
    .map(|name| RepoSpec::github("ActivityWatch", name))
    .collect()
}

impl Config {
    /// Layer the TOML file (if any) and `CONTRIB_STATS_*` environment
    /// variables over the built-in defaults. An explicit `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        debug!("Loading configuration from {}", file.display());

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(file.as_path()).required(required))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration {}", file.display()))?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        if config.repos.is_empty() {
            config.repos = default_repos();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection.concurrency == 0 {
            bail!("collection.concurrency must be at least 1");
        }
        if self.identity.bot_marker.is_empty() {
            bail!("identity.bot_marker must not be empty");
        }

        let mut names = HashSet::new();
        for repo in &self.repos {
            if repo.name.is_empty() {
                bail!("Repository entries need a name");
            }
            if [TOTAL_PAGE, COMBINED_PAGE]
                .iter()
                .any(|page| repo.name.eq_ignore_ascii_case(page))
            {
                bail!(
                    "Repository name {} is reserved for a report page",
                    repo.name
                );
            }
            if !names.insert(repo.name.as_str()) {
                bail!("Repository {} is listed twice", repo.name);
            }
            if repo.github.is_none() && repo.path.is_none() {
                bail!("Repository {} has neither a GitHub name nor a path", repo.name);
            }
        }

        self.alias_table()?;
        Ok(())
    }

    pub fn alias_table(&self) -> Result<AliasTable> {
        AliasTable::new(&self.identity.aliases).context("Invalid alias table")
    }

    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            bot_marker: self.identity.bot_marker.clone(),
            min_total: self.report.min_total,
            ascending: self.report.ascending,
            max_rows: self.report.max_rows,
        }
    }
}
