use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

mod cache;
mod collect;
mod config;
mod error;
mod git;
mod github;
mod identity;
mod output;
mod stats;

use cache::DiskCache;
use collect::Collector;
use crate::config::{discover_clones, Config, RepoSpec};
use github::{CachedSource, GitHubClient};
use output::{console, OutputFormat, Report, Reporter};
use stats::build_aggregate;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./contributor-stats.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local clones to analyze; replaces the configured repository list
    paths: Vec<PathBuf>,

    /// Analyze every git clone found in this directory
    #[arg(long)]
    scan_dir: Option<PathBuf>,

    /// Only count activity on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output format (html, json)
    #[arg(short, long)]
    output: Option<String>,

    /// Directory the report files are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Hide contributors whose total is not above this
    #[arg(long)]
    min_total: Option<u64>,

    /// List the most active contributors last
    #[arg(long)]
    ascending: bool,

    /// Show at most this many contributors per table
    #[arg(long)]
    max_rows: Option<usize>,

    /// Skip the GitHub API, use local git history only
    #[arg(long)]
    no_github: bool,

    /// Skip blame line ownership (the slowest part of git analysis)
    #[arg(long)]
    no_blame: bool,

    /// Do not read or write the response cache
    #[arg(long)]
    no_cache: bool,

    /// Delete the response cache before collecting
    #[arg(long)]
    clear_cache: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command-line flags override the configuration file and environment.
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(since) = self.since {
            config.collection.since = since;
        }
        if let Some(format) = &self.output {
            config.report.format = OutputFormat::from(format.as_str());
        }
        if let Some(dir) = &self.output_dir {
            config.report.output_dir = dir.clone();
        }
        if let Some(min_total) = self.min_total {
            config.report.min_total = Some(min_total);
        }
        if self.ascending {
            config.report.ascending = true;
        }
        if let Some(max_rows) = self.max_rows {
            config.report.max_rows = Some(max_rows);
        }
        if self.no_github {
            config.collection.github = false;
        }
        if self.no_blame {
            config.collection.blame = false;
        }
        if self.no_cache {
            config.collection.use_cache = false;
        }

        let mut clones = self.paths.clone();
        if let Some(dir) = &self.scan_dir {
            clones.extend(discover_clones(dir)?);
        }
        if !clones.is_empty() {
            config.repos = clones
                .iter()
                .map(|path| RepoSpec::from_clone(path))
                .collect::<Result<Vec<_>>>()?;
        }

        config.validate()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    // RUST_LOG, when set, takes precedence over --verbose.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    println!(
        "{}",
        "Contributor Stats - Repository Activity Report"
            .bright_cyan()
            .bold()
    );

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config)?;
    let aliases = config.alias_table()?;
    let since = config.collection.since;

    println!(
        "Repositories: {} since {}",
        config.repos.len().to_string().bright_white(),
        since.to_string().bright_white()
    );

    let cache = if config.collection.use_cache {
        DiskCache::new(&config.collection.cache_dir)
    } else {
        DiskCache::disabled()
    };
    if cli.clear_cache {
        cache.clear()?;
    }

    let source = if config.collection.github {
        let client = GitHubClient::new(&config.collection.api_base_url, cli.token.clone())?;
        Some(CachedSource::new(client, Arc::new(cache)))
    } else {
        info!("GitHub collection disabled, using git history only");
        None
    };
    let collector = Arc::new(Collector::new(
        source,
        since,
        &config.identity.bot_marker,
        config.collection.blame,
    ));

    info!("Starting collection of {} repositories...", config.repos.len());
    let results = collector
        .collect_all(&config.repos, config.collection.concurrency)
        .await;

    let named = config
        .repos
        .iter()
        .map(|spec| spec.name.clone())
        .zip(results)
        .collect();
    let (total, tables) = build_aggregate(named, &aliases);
    if tables.is_empty() {
        bail!("None of the {} repositories could be collected", config.repos.len());
    }

    let tables: Vec<_> = tables
        .into_iter()
        .map(|table| {
            let github = config
                .repos
                .iter()
                .find(|spec| spec.name == table.repo)
                .and_then(|spec| spec.github.clone());
            (table, github)
        })
        .collect();

    info!("Total contributors: {}", total.len());

    let report = Report::new(since, &total, &tables, &config.display_options());
    console::print_report(&report);

    let reporter = Reporter::new(config.report.format, &config.report.output_dir);
    let written = reporter.generate_report(&report).await?;

    println!(
        "\n{} ({} files in {})",
        "Report complete!".bright_green().bold(),
        written.len(),
        config.report.output_dir.display()
    );

    Ok(())
}
