pub mod api;
pub mod fetcher;
pub mod rate_limiter;

#[cfg(test)]
mod tests;

pub use api::{ListingPage, ListingSource, RedditApiClient, RedditListing, PAGE_SIZE_LIMIT};
pub use fetcher::{FetchConfig, FetchSummary, PaginatedFetcher, Termination};
pub use rate_limiter::{IntervalPacer, Pacer, PacerConfig, PacerStatus};

use post_store::Deduplicator;
use redditkeep_core::{AppConfig, CoreError};

/// Fetcher wired to the live Reddit listing endpoint.
pub type RedditFetcher = PaginatedFetcher<RedditApiClient, IntervalPacer>;

impl RedditFetcher {
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let client = RedditApiClient::with_base_url(&config.base_url, config.user_agent.clone())?;
        let pacer = IntervalPacer::new(PacerConfig {
            base_delay: config.fetch.delay(),
            jitter: config.fetch.jitter(),
        });
        Ok(PaginatedFetcher::new(
            client,
            pacer,
            Deduplicator::new(&config.store_path),
        ))
    }
}
