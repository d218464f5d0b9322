//! Time-cached read replica of the store file for the query path.

use crate::file::read_json;
use redditkeep_core::{normalize, ErrorExt, NormalizedPost, StoreError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[derive(Debug, Default)]
struct CacheState {
    posts: Arc<Vec<NormalizedPost>>,
    loaded_at: Option<Instant>,
}

/// Cached view of the store, newest post first.
///
/// Merges do not notify the cache: a freshly merged post shows up once the
/// freshness window has passed or after [`PostStore::invalidate`].
#[derive(Debug)]
pub struct PostStore<C: Clock = SystemClock> {
    path: PathBuf,
    freshness_window: Duration,
    clock: C,
    state: tokio::sync::Mutex<CacheState>,
}

impl PostStore<SystemClock> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, DEFAULT_FRESHNESS_WINDOW, SystemClock)
    }
}

impl<C: Clock> PostStore<C> {
    pub fn with_clock(path: impl Into<PathBuf>, freshness_window: Duration, clock: C) -> Self {
        Self {
            path: path.into(),
            freshness_window,
            clock,
            state: tokio::sync::Mutex::new(CacheState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// The full collection. Never fails: a reload error keeps the previous
    /// collection (or an empty one) and is only logged.
    pub async fn get_all(&self) -> Arc<Vec<NormalizedPost>> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let stale = match state.loaded_at {
            None => true,
            Some(loaded_at) => now.saturating_duration_since(loaded_at) > self.freshness_window,
        };

        if stale || state.posts.is_empty() {
            match load_sorted(&self.path).await {
                Ok(posts) => {
                    info!(
                        "Loaded & sorted {} posts from {}",
                        posts.len(),
                        self.path.display()
                    );
                    state.posts = Arc::new(posts);
                    state.loaded_at = Some(now);
                }
                Err(e) => {
                    e.log_warn();
                    warn!(
                        "Failed to load {}, serving {} cached posts",
                        self.path.display(),
                        state.posts.len()
                    );
                }
            }
        }

        Arc::clone(&state.posts)
    }

    /// Force the next [`get_all`](Self::get_all) to reload from disk.
    pub async fn invalidate(&self) {
        self.state.lock().await.loaded_at = None;
    }
}

async fn load_sorted(path: &Path) -> Result<Vec<NormalizedPost>, StoreError> {
    let value = read_json(path)
        .await?
        .ok_or_else(|| StoreError::Unreadable {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;

    let Value::Array(raw) = value else {
        return Err(StoreError::NotAnArray {
            path: path.to_path_buf(),
        });
    };

    let mut posts: Vec<NormalizedPost> = raw.iter().map(normalize).collect();
    // stable: equal timestamps keep file order
    posts.sort_by(|a, b| b.data.created_utc.total_cmp(&a.data.created_utc));
    Ok(posts)
}
