//! On-disk memoization of expensive calls.
//!
//! Entries are keyed by the call's identity (a function name plus its
//! serialized arguments) and are never expired: a different argument is a
//! different entry. Delete the cache directory, or pass `--clear-cache`, to
//! refetch.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    function: String,
    args: serde_json::Value,
    value: T,
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: Option<PathBuf>,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// A cache that always computes and never stores.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    fn entry_path<A: Serialize>(&self, dir: &Path, function: &str, args: &A) -> Result<PathBuf> {
        let args = serde_json::to_vec(args).context("Failed to serialize cache key")?;
        let mut hasher = Sha256::new();
        hasher.update(function.as_bytes());
        hasher.update([0u8]);
        hasher.update(&args);
        let digest = format!("{:x}", hasher.finalize());
        Ok(dir.join(function).join(format!("{}.json", digest)))
    }

    async fn read<T: DeserializeOwned>(path: &Path) -> Option<T> {
        let bytes = tokio::fs::read(path).await.ok()?;
        match serde_json::from_slice::<CacheEntry<T>>(&bytes) {
            Ok(entry) => Some(entry.value),
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn write<T: Serialize, A: Serialize>(
        path: &Path,
        function: &str,
        args: &A,
        value: &T,
    ) -> Result<()> {
        let parent = path
            .parent()
            .with_context(|| format!("Cache path {} has no parent", path.display()))?;
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create cache directory {}", parent.display()))?;

        let entry = CacheEntry {
            function: function.to_string(),
            args: serde_json::to_value(args)?,
            value,
        };
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(&entry)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Return the stored result for `(function, args)`, or run `compute` and
    /// store its successful result. Cache IO problems are logged, never fatal.
    pub async fn get_or_compute<T, A, E, F, Fut>(
        &self,
        function: &str,
        args: &A,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        A: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(dir) = &self.dir else {
            return compute().await;
        };

        let path = match self.entry_path(dir, function, args) {
            Ok(path) => path,
            Err(e) => {
                warn!("Not caching {}: {}", function, e);
                return compute().await;
            }
        };

        if let Some(value) = Self::read(&path).await {
            debug!("Cache hit for {} ({})", function, path.display());
            return Ok(value);
        }

        debug!("Cache miss for {}", function);
        let value = compute().await?;
        if let Err(e) = Self::write(&path, function, args, &value).await {
            warn!("Failed to write cache entry {}: {:#}", path.display(), e);
        }
        Ok(value)
    }

    pub fn clear(&self) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        if dir.exists() {
            std::fs::remove_dir_all(dir)
                .with_context(|| format!("Failed to clear cache {}", dir.display()))?;
            info!("Cleared cache at {}", dir.display());
        }
        Ok(())
    }
}
