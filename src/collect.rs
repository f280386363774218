//! Per-repository collection: GitHub activity and local git history are
//! gathered into one `RepoStats`, repositories running side by side.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::RepoSpec;
use crate::error::StatsError;
use crate::git::{GitActivity, GitAnalyzer};
use crate::github::{collectors, ActivitySource};
use crate::identity::Normalizer;
use crate::stats::RepoStats;

pub struct Collector<S> {
    /// `None` skips GitHub entirely.
    source: Option<S>,
    since: NaiveDate,
    bot_marker: String,
    blame: bool,
}

impl<S> Collector<S> {
    pub fn new(source: Option<S>, since: NaiveDate, bot_marker: &str, blame: bool) -> Self {
        Self {
            source,
            since,
            bot_marker: bot_marker.to_string(),
            blame,
        }
    }

    fn since_utc(&self) -> DateTime<Utc> {
        self.since.and_time(NaiveTime::MIN).and_utc()
    }
}

impl<S: ActivitySource + Send + Sync + 'static> Collector<S> {
    /// Raw statistics of one repository, before alias resolution.
    pub async fn collect_repo(&self, spec: &RepoSpec) -> Result<RepoStats, StatsError> {
        let mut stats = RepoStats::new(&spec.name, self.since);
        let mut names = Normalizer::new();

        if let (Some(source), Some(full_name)) = (&self.source, &spec.github) {
            let activity = source
                .fetch_activity(full_name, self.since_utc())
                .await
                .map_err(|fault| StatsError::SourceUnavailable {
                    repo: spec.name.clone(),
                    fault,
                })?;
            collectors::apply(
                &activity,
                self.since_utc(),
                &self.bot_marker,
                &mut names,
                &mut stats,
            );
        }

        if let Some(path) = &spec.path {
            let activity = analyze_clone(&spec.name, path.clone(), self.since, self.blame).await?;
            activity.apply_to(&mut stats, &mut names);
        }

        debug!(
            "{}: {} contributors collected",
            spec.name,
            stats.contributors().len()
        );
        Ok(stats)
    }

    /// Collect every repository, at most `concurrency` at a time. Results come
    /// back in the order of `repos`, one per repository.
    pub async fn collect_all(
        self: Arc<Self>,
        repos: &[RepoSpec],
        concurrency: usize,
    ) -> Vec<Result<RepoStats, StatsError>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let pb = ProgressBar::new(repos.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} repositories ({msg})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );

        let mut tasks = JoinSet::new();
        for (index, spec) in repos.iter().cloned().enumerate() {
            let collector = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                info!("Processing for {}...", spec.name);
                (index, collector.collect_repo(&spec).await)
            });
        }

        let mut results: Vec<Option<Result<RepoStats, StatsError>>> =
            repos.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    pb.set_message(repos[index].name.clone());
                    results[index] = Some(result);
                }
                Err(e) => tracing::error!("Collection task failed: {}", e),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        results
            .into_iter()
            .zip(repos)
            .map(|(result, spec)| {
                result.unwrap_or_else(|| {
                    Err(StatsError::git(
                        &spec.name,
                        git2::Error::from_str("collection task did not finish"),
                    ))
                })
            })
            .collect()
    }
}

async fn analyze_clone(
    repo: &str,
    path: PathBuf,
    since: NaiveDate,
    blame: bool,
) -> Result<GitActivity, StatsError> {
    let joined = tokio::task::spawn_blocking(move || {
        GitAnalyzer::new(&path)?.analyze(since, blame)
    })
    .await;

    match joined {
        Ok(result) => result.map_err(|e| StatsError::git(repo, e)),
        Err(e) => Err(StatsError::git(
            repo,
            git2::Error::from_str(&format!("git analysis panicked: {}", e)),
        )),
    }
}
