//! Deduplicated append of new posts into the persisted collection.

use crate::file::{read_json, write_json_pretty};
use chrono::Utc;
use redditkeep_core::{normalize, CoreError, MergeOutcome, StoreError};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Merges batches of raw posts into a single JSON-array store file.
///
/// Existing entries are kept exactly as stored and in order; new posts are
/// appended. Posts with an empty id are never stored, and a post whose id is
/// already present (or appeared earlier in the same batch) is skipped, so
/// re-running a merge with the same batch is a no-op.
///
/// The store expects a single writer; concurrent merges on one file race.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    target_path: PathBuf,
}

impl Deduplicator {
    pub fn new(target_path: impl Into<PathBuf>) -> Self {
        Self {
            target_path: target_path.into(),
        }
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub async fn merge(&self, new_raw_posts: &[Value]) -> Result<MergeOutcome, CoreError> {
        if new_raw_posts.is_empty() {
            let total = self.count_existing().await?;
            info!("No new posts provided, nothing to migrate");
            return Ok(MergeOutcome { added: 0, total });
        }

        let normalized = new_raw_posts.iter().map(normalize);
        let mut existing = self.load_existing().await?;

        let mut seen: HashSet<String> = existing.iter().filter_map(stored_id).collect();
        let mut unique = Vec::new();
        for post in normalized {
            if !post.has_id() {
                debug!("Skipping post without id: {:?}", post.data.title);
                continue;
            }
            if seen.insert(post.data.id.clone()) {
                unique.push(post);
            }
        }

        if unique.is_empty() {
            info!("No new unique posts to add");
            return Ok(MergeOutcome {
                added: 0,
                total: existing.len(),
            });
        }

        let added = unique.len();
        for post in unique {
            existing.push(serde_json::to_value(post)?);
        }

        write_json_pretty(&self.target_path, &existing).await?;

        info!(
            "Added {} new posts to {} ({} total)",
            added,
            self.target_path.display(),
            existing.len()
        );
        Ok(MergeOutcome {
            added,
            total: existing.len(),
        })
    }

    /// Number of stored entries, without touching the file. A non-array
    /// document counts as empty and is left for the next non-empty merge.
    async fn count_existing(&self) -> Result<usize, CoreError> {
        match read_json(&self.target_path).await? {
            Some(Value::Array(posts)) => Ok(posts.len()),
            Some(_) => {
                warn!(
                    "{} does not contain a JSON array; treating it as empty",
                    self.target_path.display()
                );
                Ok(0)
            }
            None => Ok(0),
        }
    }

    /// Load the stored array. A missing file is an empty store; a non-array
    /// document is backed up next to the store and the store is reset to `[]`.
    async fn load_existing(&self) -> Result<Vec<Value>, CoreError> {
        match read_json(&self.target_path).await? {
            None => Ok(Vec::new()),
            Some(Value::Array(posts)) => Ok(posts),
            Some(_) => {
                let backup = self.back_up_invalid_store().await?;
                write_json_pretty(&self.target_path, &Vec::<Value>::new()).await?;
                error!(
                    "{} does not contain a JSON array; moved aside to {} and reset to an empty store",
                    self.target_path.display(),
                    backup.display()
                );
                Ok(Vec::new())
            }
        }
    }

    async fn back_up_invalid_store(&self) -> Result<PathBuf, CoreError> {
        let name = self
            .target_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());
        let backup = self.target_path.with_file_name(format!(
            "{}.invalid-{}.bak",
            name,
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        ));

        tokio::fs::copy(&self.target_path, &backup)
            .await
            .map_err(|source| StoreError::WriteFailed {
                path: backup.clone(),
                source,
            })?;
        Ok(backup)
    }
}

/// Convenience wrapper for a one-off merge into `target_path`.
pub async fn merge(new_raw_posts: &[Value], target_path: &Path) -> Result<MergeOutcome, CoreError> {
    Deduplicator::new(target_path).merge(new_raw_posts).await
}

fn stored_id(post: &Value) -> Option<String> {
    post.get("data")
        .and_then(|d| d.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
