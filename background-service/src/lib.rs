//! Harvests several subreddits one after another into the same store.

use reddit_client::{FetchConfig, ListingSource, Pacer, PaginatedFetcher, Termination};
use redditkeep_core::{BatchPolicy, CoreError, ErrorExt, ErrorReporter, FetchSettings};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubredditOutcome {
    Fetched {
        subreddit: String,
        pages_fetched: u32,
        posts_fetched: usize,
        added: usize,
        total: usize,
        termination: Termination,
    },
    Failed {
        subreddit: String,
        error_code: String,
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<SubredditOutcome>,
}

impl BatchReport {
    pub fn added(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                SubredditOutcome::Fetched { added, .. } => *added,
                SubredditOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SubredditOutcome::Failed { .. }))
            .count()
    }
}

/// Runs the paginated fetch for each subreddit in order. Whether a failure
/// stops the rest of the batch is decided by the [`BatchPolicy`].
pub struct BackgroundService<S, P> {
    fetcher: PaginatedFetcher<S, P>,
    subreddits: Vec<String>,
    settings: FetchSettings,
    policy: BatchPolicy,
    reporter: ErrorReporter,
}

impl<S, P> BackgroundService<S, P>
where
    S: ListingSource,
    P: Pacer,
{
    pub fn new(
        fetcher: PaginatedFetcher<S, P>,
        subreddits: Vec<String>,
        settings: FetchSettings,
        policy: BatchPolicy,
    ) -> Self {
        Self {
            fetcher,
            subreddits,
            settings,
            policy,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn fetcher(&self) -> &PaginatedFetcher<S, P> {
        &self.fetcher
    }

    /// With [`BatchPolicy::Abort`] the first failure is returned as the error;
    /// with [`BatchPolicy::Continue`] it is recorded in the report.
    pub async fn run_once(&self) -> Result<BatchReport, CoreError> {
        let mut report = BatchReport::default();

        for subreddit in &self.subreddits {
            let config = FetchConfig::for_subreddit(&self.settings, subreddit);

            match self.fetcher.fetch_all(subreddit, &config).await {
                Ok(summary) => {
                    report.outcomes.push(SubredditOutcome::Fetched {
                        subreddit: subreddit.clone(),
                        pages_fetched: summary.pages_fetched,
                        posts_fetched: summary.total_fetched(),
                        added: summary.merge.added,
                        total: summary.merge.total,
                        termination: summary.termination,
                    });
                }
                Err(e) => {
                    self.reporter.report_error(&e);
                    match self.policy {
                        BatchPolicy::Abort => {
                            warn!(
                                "Aborting batch at r/{} after {} completed subreddits",
                                subreddit,
                                report.outcomes.len()
                            );
                            return Err(e);
                        }
                        BatchPolicy::Continue => {
                            warn!("Skipping r/{} and continuing with the batch", subreddit);
                            report.outcomes.push(SubredditOutcome::Failed {
                                subreddit: subreddit.clone(),
                                error_code: e.error_code(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        info!(
            "Batch finished: {} subreddits, {} new posts, {} failures",
            report.outcomes.len(),
            report.added(),
            report.failures()
        );
        Ok(report)
    }
}
