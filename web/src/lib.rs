//! HTTP view over the post store.
//!
//! `GET /` accepts `author`, `subreddit`, `flair`, `keyword` and `page` query
//! parameters and answers with one page of matching posts as JSON.

pub mod error;
pub mod render;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{TimeZone, Utc};
use post_store::{Clock, PostStore, SystemClock};
use redditkeep_core::{parse_page, query, NormalizedPost, PostFilters};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub use error::{WebError, LOAD_FAILURE_MESSAGE};
pub use render::render_markdown;

pub struct AppState<C: Clock = SystemClock> {
    pub store: Arc<PostStore<C>>,
}

impl<C: Clock> AppState<C> {
    pub fn new(store: PostStore<C>) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

impl<C: Clock> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub author: Option<String>,
    pub subreddit: Option<String>,
    pub flair: Option<String>,
    pub keyword: Option<String>,
    pub page: Option<String>,
}

impl ListParams {
    fn filters(&self) -> PostFilters {
        PostFilters {
            author: self.author.clone(),
            subreddit: self.subreddit.clone(),
            flair: self.flair.clone(),
            keyword: self.keyword.clone(),
        }
    }
}

/// A stored post plus fields derived for display.
#[derive(Debug, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: NormalizedPost,
    pub selftext_html: String,
    /// RFC 3339 creation time, absent when the post has no timestamp.
    pub created: Option<String>,
}

impl From<NormalizedPost> for PostView {
    fn from(post: NormalizedPost) -> Self {
        let selftext_html = render_markdown(&post.data.selftext);
        let created = created_at(post.data.created_utc);
        Self {
            post,
            selftext_html,
            created,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsResponse {
    pub posts: Vec<PostView>,
    pub filters: PostFilters,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_results: usize,
}

pub fn router<C: Clock + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/", get(list_posts::<C>))
        .with_state(state)
}

async fn list_posts<C: Clock + 'static>(
    State(state): State<AppState<C>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, WebError> {
    let Query(params) = params?;
    let posts = state.store.get_all().await;
    let filters = params.filters();
    let page = parse_page(params.page.as_deref());

    let result = query(&posts, &filters, page);
    debug!(
        "Serving page {} of {} ({} matching posts)",
        result.current_page, result.total_pages, result.total_results
    );

    let body = serde_json::to_vec(&PostsResponse {
        posts: result.items.into_iter().map(PostView::from).collect(),
        filters,
        current_page: result.current_page,
        total_pages: result.total_pages,
        total_results: result.total_results,
    })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

fn created_at(created_utc: f64) -> Option<String> {
    if !created_utc.is_finite() || created_utc <= 0.0 {
        return None;
    }
    Utc.timestamp_opt(created_utc.trunc() as i64, 0)
        .single()
        .map(|t| t.to_rfc3339())
}
