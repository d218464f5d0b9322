//! Cursor-following fetch loop over a [`ListingSource`].

use crate::api::{ListingSource, PAGE_SIZE_LIMIT};
use crate::rate_limiter::Pacer;
use post_store::file::write_json_pretty;
use post_store::Deduplicator;
use redditkeep_core::{CoreError, FetchSettings, MergeOutcome};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Hard cap on pages; reaching it ends the fetch even if more pages exist.
    pub max_pages: u32,
    pub page_size: u32,
    /// Also write every page's raw children to `output_dir/page-NNN.json`.
    pub save_each_page: bool,
    pub output_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            page_size: PAGE_SIZE_LIMIT,
            save_each_page: false,
            output_dir: PathBuf::from("reddit-data"),
        }
    }
}

impl FetchConfig {
    pub fn for_subreddit(settings: &FetchSettings, subreddit: &str) -> Self {
        Self {
            max_pages: settings.max_pages,
            page_size: PAGE_SIZE_LIMIT,
            save_each_page: settings.save_each_page,
            output_dir: settings.output_dir_for(subreddit),
        }
    }
}

/// Why the fetch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The source returned no further cursor.
    Exhausted,
    /// `max_pages` was reached while the source still had a cursor.
    PageCap,
}

#[derive(Debug, Clone)]
pub struct FetchSummary {
    pub items: Vec<Value>,
    pub pages_fetched: u32,
    pub last_cursor: Option<String>,
    pub termination: Termination,
    pub merge: MergeOutcome,
}

impl FetchSummary {
    pub fn total_fetched(&self) -> usize {
        self.items.len()
    }
}

/// Sequentially walks a subreddit listing page by page, then merges every
/// fetched post into the store in one go.
///
/// Exactly one request is in flight at a time and the pacer runs only between
/// pages. Any request or envelope error aborts the whole fetch before the
/// merge, so a failed fetch never touches the store.
#[derive(Debug)]
pub struct PaginatedFetcher<S, P> {
    source: S,
    pacer: P,
    deduplicator: Deduplicator,
}

impl<S, P> PaginatedFetcher<S, P>
where
    S: ListingSource,
    P: Pacer,
{
    pub fn new(source: S, pacer: P, deduplicator: Deduplicator) -> Self {
        Self {
            source,
            pacer,
            deduplicator,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub fn store_path(&self) -> &Path {
        self.deduplicator.target_path()
    }

    pub async fn fetch_all(
        &self,
        subreddit: &str,
        config: &FetchConfig,
    ) -> Result<FetchSummary, CoreError> {
        let max_pages = config.max_pages.max(1);
        let page_size = config.page_size.clamp(1, PAGE_SIZE_LIMIT);
        info!("Starting paginated fetch for r/{}", subreddit);

        let mut items = Vec::new();
        let mut after: Option<String> = None;
        let mut pages_fetched = 0u32;

        let termination = loop {
            pages_fetched += 1;
            info!(
                "Fetching page {} of r/{} (after: {})",
                pages_fetched,
                subreddit,
                after.as_deref().unwrap_or("-")
            );

            let page = self
                .source
                .fetch_page(subreddit, after.as_deref(), page_size)
                .await?;
            let next = page.after.filter(|a| !a.is_empty());

            info!(
                "  Got {} posts | next after: {}",
                page.children.len(),
                next.as_deref().unwrap_or("(end)")
            );

            if config.save_each_page {
                save_page(&config.output_dir, pages_fetched, &page.children).await;
            }
            items.extend(page.children);
            after = next;

            if after.is_none() {
                break Termination::Exhausted;
            }
            if pages_fetched >= max_pages {
                warn!(
                    "Reached max_pages limit ({}) for r/{}, stopping with more pages available",
                    max_pages, subreddit
                );
                break Termination::PageCap;
            }

            self.pacer.pace().await;
        };

        let merge = self.deduplicator.merge(&items).await?;
        info!(
            "Finished r/{}: {} posts over {} pages, {} new ({} total in store)",
            subreddit,
            items.len(),
            pages_fetched,
            merge.added,
            merge.total
        );

        Ok(FetchSummary {
            items,
            pages_fetched,
            last_cursor: after,
            termination,
            merge,
        })
    }
}

/// Page files are a debugging aid; failing to write one is logged and the
/// fetch carries on.
async fn save_page(output_dir: &Path, page_number: u32, children: &[Value]) {
    let path = page_file_path(output_dir, page_number);
    match write_json_pretty(&path, children).await {
        Ok(()) => info!("  Saved: {}", path.display()),
        Err(e) => warn!("Failed to save page file {}: {}", path.display(), e),
    }
}

pub fn page_file_path(output_dir: &Path, page_number: u32) -> PathBuf {
    output_dir.join(format!("page-{:03}.json", page_number))
}
