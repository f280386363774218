use super::*;
use chrono::{TimeZone, Utc};
use git2::{BlameOptions, ObjectType, Oid, Repository, Sort, TreeWalkMode, TreeWalkResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct GitAnalyzer {
    repo: Repository,
    path: PathBuf,
}

impl GitAnalyzer {
    pub fn new(path: &Path) -> Result<Self, git2::Error> {
        let repo = Repository::open(path)?;

        info!("Opened Git repository at {}", path.display());

        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// Commit authorship since `since`, plus blame ownership of HEAD when
    /// `blame` is set.
    pub fn analyze(&self, since: NaiveDate, blame: bool) -> Result<GitActivity, git2::Error> {
        let mut activity = GitActivity::default();

        self.analyze_commits(since, &mut activity)?;
        if blame {
            activity.blame_lines = self.blame_line_counts()?;
        }

        info!(
            "Git analysis of {} complete: {} commits by {} authors",
            self.path.display(),
            activity.commits.values().sum::<u64>(),
            activity.commits.len()
        );

        Ok(activity)
    }

    fn analyze_commits(&self, since: NaiveDate, activity: &mut GitActivity) -> Result<(), git2::Error> {
        let mut revwalk = self.repo.revwalk()?;

        match self.repo.head() {
            Ok(head) => {
                if let Some(target) = head.target() {
                    revwalk.push(target)?;
                    debug!(
                        "Analyzing commits from current branch: {}",
                        head.shorthand().unwrap_or("HEAD")
                    );
                }
            }
            Err(e) => {
                warn!("{} has no HEAD ({}), skipping commits", self.path.display(), e.message());
                return Ok(());
            }
        }

        revwalk.set_sorting(Sort::TIME)?;

        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            let author = commit.author();
            let Some(authored) = Utc.timestamp_opt(author.when().seconds(), 0).single() else {
                continue;
            };
            let day = authored.date_naive();
            if day < since {
                continue;
            }

            let name = String::from_utf8_lossy(author.name_bytes()).to_string();
            *activity.commits.entry(name.clone()).or_insert(0) += 1;
            activity.commit_days.entry(name.clone()).or_default().insert(day);

            // Merge commits only repeat the changes of their parents.
            if commit.parent_count() > 1 {
                continue;
            }
            let tree = commit.tree()?;
            let parent_tree = match commit.parent(0) {
                Ok(parent) => Some(parent.tree()?),
                Err(_) => None,
            };
            let diff = self
                .repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
            let stats = diff.stats()?;
            *activity.lines_added.entry(name.clone()).or_insert(0) += stats.insertions() as u64;
            *activity.lines_removed.entry(name).or_insert(0) += stats.deletions() as u64;
        }

        Ok(())
    }

    fn head_files(&self) -> Result<Vec<(String, Oid)>, git2::Error> {
        let tree = match self.repo.head() {
            Ok(head) => head.peel_to_tree()?,
            Err(_) => return Ok(Vec::new()),
        };

        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    files.push((format!("{}{}", root, name), entry.id()));
                }
            }
            TreeWalkResult::Ok
        })?;
        Ok(files)
    }

    /// Lines of every text file at HEAD, attributed to the author who last
    /// touched them.
    pub fn blame_line_counts(&self) -> Result<BTreeMap<String, u64>, git2::Error> {
        let files = self.head_files()?;
        let mut counts = BTreeMap::new();

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} files blamed ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );

        for (path, oid) in files {
            pb.inc(1);
            if self.repo.find_blob(oid)?.is_binary() {
                continue;
            }

            let mut options = BlameOptions::new();
            let blame = match self.repo.blame_file(Path::new(&path), Some(&mut options)) {
                Ok(blame) => blame,
                Err(e) => {
                    debug!("Cannot blame {}: {}", path, e.message());
                    continue;
                }
            };

            for hunk in blame.iter() {
                let signature = hunk.final_signature();
                let name = String::from_utf8_lossy(signature.name_bytes()).to_string();
                *counts.entry(name).or_insert(0) += hunk.lines_in_hunk() as u64;
            }
        }

        pb.finish_and_clear();
        debug!(
            "Blamed {} lines in {}",
            counts.values().sum::<u64>(),
            self.path.display()
        );
        Ok(counts)
    }

    pub fn detect_remote_url(&self) -> Option<String> {
        if let Ok(remote) = self.repo.find_remote("origin") {
            if let Some(url) = remote.url() {
                return Some(url.to_string());
            }
        }

        if let Ok(remotes) = self.repo.remotes() {
            for remote_name in remotes.iter().flatten() {
                if let Ok(remote) = self.repo.find_remote(remote_name) {
                    if let Some(url) = remote.url() {
                        return Some(url.to_string());
                    }
                }
            }
        }

        None
    }
}
