use redditkeep_core::{ConfigError, CoreError, RedditApiError};
use reqwest::header::{ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

pub const REDDIT_PUBLIC_BASE: &str = "https://www.reddit.com";

/// Upstream ceiling on items per listing page.
pub const PAGE_SIZE_LIMIT: u32 = 100;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    #[serde(default)]
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<T>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub dist: Option<u32>,
}

/// One page of raw listing children plus the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub children: Vec<Value>,
    /// `None` when the source reports no further pages.
    pub after: Option<String>,
}

impl From<RedditListing<Value>> for ListingPage {
    fn from(listing: RedditListing<Value>) -> Self {
        Self {
            children: listing.data.children,
            after: listing.data.after.filter(|a| !a.is_empty()),
        }
    }
}

/// A paginated source of raw posts.
pub trait ListingSource {
    fn fetch_page(
        &self,
        subreddit: &str,
        after: Option<&str>,
        limit: u32,
    ) -> impl Future<Output = Result<ListingPage, CoreError>> + Send;
}

/// Client for the public, unauthenticated `/r/{subreddit}/.json` listings.
#[derive(Debug, Clone)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: Url,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: impl Into<String>) -> Result<Self, CoreError> {
        Self::with_base_url(REDDIT_PUBLIC_BASE, user_agent)
    }

    pub fn with_base_url(base_url: &str, user_agent: impl Into<String>) -> Result<Self, CoreError> {
        let user_agent = user_agent.into();

        let mut base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            field: "base_url".to_string(),
            value: format!("{} ({})", base_url, e),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn listing_url(&self, subreddit: &str) -> Result<Url, CoreError> {
        self.base_url
            .join(&format!("r/{}/.json", subreddit))
            .map_err(|e| CoreError::InvalidInput {
                message: format!("invalid subreddit name '{}': {}", subreddit, e),
            })
    }

    async fn make_request(
        &self,
        url: Url,
        subreddit: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let start_time = Instant::now();
        let endpoint = url.path().to_string();

        let request_builder = self
            .http_client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .query(query_params);

        info!("Making Reddit API request: GET {}", endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for GET {}: {}", endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(
                "Request successful: {} {} in {:?}",
                status,
                endpoint,
                start_time.elapsed()
            );
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let api_error = match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            StatusCode::FORBIDDEN => RedditApiError::Forbidden { resource: endpoint },
            StatusCode::NOT_FOUND => RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            },
            s if s.is_server_error() => RedditApiError::ServerError {
                status_code: s.as_u16(),
            },
            s => RedditApiError::RequestFailed {
                status_code: s.as_u16(),
                reason: s.canonical_reason().unwrap_or("Unknown").to_string(),
            },
        };
        Err(CoreError::RedditApi(api_error))
    }

    pub async fn get_subreddit_listing(
        &self,
        subreddit: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<RedditListing<Value>, CoreError> {
        let url = self.listing_url(subreddit)?;
        let limit_str = limit.clamp(1, PAGE_SIZE_LIMIT).to_string();
        let mut params = Vec::with_capacity(2);
        params.push(("limit", limit_str.as_str()));
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let response = self.make_request(url, subreddit, &params).await?;
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::RedditApi(RedditApiError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        let listing: RedditListing<Value> = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse listing for r/{}: {}", subreddit, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!(
                    "invalid listing envelope for r/{} (possible rate limit or block)",
                    subreddit
                ),
            })
        })?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }
}

impl ListingSource for RedditApiClient {
    async fn fetch_page(
        &self,
        subreddit: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<ListingPage, CoreError> {
        self.get_subreddit_listing(subreddit, after, limit)
            .await
            .map(ListingPage::from)
    }
}
