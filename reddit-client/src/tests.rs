#[cfg(test)]
mod tests {
    use crate::{
        FetchConfig, IntervalPacer, ListingPage, ListingSource, Pacer, PacerConfig,
        PaginatedFetcher, RedditApiClient, Termination,
    };
    use post_store::Deduplicator;
    use redditkeep_core::{CoreError, MergeOutcome, RedditApiError};
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        subreddit: String,
        after: Option<String>,
        limit: u32,
    }

    /// Replays a fixed list of page results and records every request.
    #[derive(Default)]
    struct ScriptedSource {
        pages: Mutex<VecDeque<Result<ListingPage, RedditApiError>>>,
        calls: Mutex<Vec<Call>>,
        endless: bool,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<ListingPage, RedditApiError>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                ..Default::default()
            }
        }

        /// Every page carries a cursor, forever.
        fn endless() -> Self {
            Self {
                endless: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ListingSource for ScriptedSource {
        async fn fetch_page(
            &self,
            subreddit: &str,
            after: Option<&str>,
            limit: u32,
        ) -> Result<ListingPage, CoreError> {
            let call_number = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(Call {
                    subreddit: subreddit.to_string(),
                    after: after.map(str::to_string),
                    limit,
                });
                calls.len()
            };

            if self.endless {
                let id = format!("endless{}", call_number);
                let cursor = format!("t3_{}", id);
                return Ok(page(&[id.as_str()], Some(cursor.as_str())));
            }

            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .expect("source asked for more pages than scripted")
                .map_err(CoreError::from)
        }
    }

    #[derive(Default)]
    struct RecordingPacer {
        waits: AtomicUsize,
    }

    impl RecordingPacer {
        fn waits(&self) -> usize {
            self.waits.load(Ordering::SeqCst)
        }
    }

    impl Pacer for RecordingPacer {
        async fn pace(&self) {
            self.waits.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn child(id: &str) -> Value {
        json!({"kind": "t3", "data": {"id": id, "title": format!("post {}", id), "subreddit": "lpr"}})
    }

    fn page(ids: &[&str], after: Option<&str>) -> ListingPage {
        ListingPage {
            children: ids.iter().map(|id| child(id)).collect(),
            after: after.map(str::to_string),
        }
    }

    fn fetcher_with(
        source: ScriptedSource,
        store: &Path,
    ) -> PaginatedFetcher<ScriptedSource, RecordingPacer> {
        PaginatedFetcher::new(source, RecordingPacer::default(), Deduplicator::new(store))
    }

    fn config(max_pages: u32) -> FetchConfig {
        FetchConfig {
            max_pages,
            ..FetchConfig::default()
        }
    }

    // Fetch Loop Tests
    #[tokio::test]
    async fn test_follows_cursor_to_natural_end() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("data.json");
        let source = ScriptedSource::new(vec![
            Ok(page(&["a", "b"], Some("t3_b"))),
            Ok(page(&["c"], Some("t3_c"))),
            Ok(page(&["d"], None)),
        ]);
        let fetcher = fetcher_with(source, &store);

        let summary = fetcher.fetch_all("lpr", &config(50)).await.unwrap();

        assert_eq!(summary.pages_fetched, 3);
        assert_eq!(summary.termination, Termination::Exhausted);
        assert_eq!(summary.last_cursor, None);
        assert_eq!(summary.total_fetched(), 4);
        assert_eq!(summary.merge, MergeOutcome { added: 4, total: 4 });
        assert_eq!(fetcher.pacer().waits(), 2);

        let calls = fetcher.source().calls();
        let cursors: Vec<Option<&str>> = calls.iter().map(|c| c.after.as_deref()).collect();
        assert_eq!(cursors, vec![None, Some("t3_b"), Some("t3_c")]);
        assert!(calls.iter().all(|c| c.limit == 100 && c.subreddit == "lpr"));
    }

    #[tokio::test]
    async fn test_stops_at_page_cap_with_cursor_remaining() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("data.json");
        let fetcher = fetcher_with(ScriptedSource::endless(), &store);

        let summary = fetcher.fetch_all("sibo", &config(3)).await.unwrap();

        assert_eq!(summary.pages_fetched, 3);
        assert_eq!(summary.termination, Termination::PageCap);
        assert_eq!(summary.last_cursor.as_deref(), Some("t3_endless3"));
        assert_eq!(fetcher.source().calls().len(), 3);
        assert_eq!(fetcher.pacer().waits(), 2);
        assert_eq!(summary.merge.added, 3);
    }

    #[tokio::test]
    async fn test_last_page_at_cap_without_cursor_is_natural_end() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(vec![
            Ok(page(&["a"], Some("t3_a"))),
            Ok(page(&["b"], None)),
        ]);
        let fetcher = fetcher_with(source, &dir.path().join("data.json"));

        let summary = fetcher.fetch_all("gerd", &config(2)).await.unwrap();
        assert_eq!(summary.termination, Termination::Exhausted);
        assert_eq!(summary.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_single_page_never_waits() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(vec![Ok(page(&["a"], None))]);
        let fetcher = fetcher_with(source, &dir.path().join("data.json"));

        fetcher.fetch_all("gerd", &config(50)).await.unwrap();
        assert_eq!(fetcher.pacer().waits(), 0);
    }

    #[tokio::test]
    async fn test_max_pages_one_never_waits() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher_with(ScriptedSource::endless(), &dir.path().join("data.json"));

        let summary = fetcher.fetch_all("gerd", &config(1)).await.unwrap();
        assert_eq!(summary.termination, Termination::PageCap);
        assert_eq!(fetcher.pacer().waits(), 0);
    }

    #[tokio::test]
    async fn test_empty_cursor_ends_fetch() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(vec![Ok(page(&["a"], Some("")))]);
        let fetcher = fetcher_with(source, &dir.path().join("data.json"));

        let summary = fetcher.fetch_all("lpr", &config(50)).await.unwrap();
        assert_eq!(summary.pages_fetched, 1);
        assert_eq!(summary.termination, Termination::Exhausted);
    }

    #[tokio::test]
    async fn test_error_aborts_without_merge() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("data.json");
        let source = ScriptedSource::new(vec![
            Ok(page(&["a", "b"], Some("t3_b"))),
            Err(RedditApiError::ServerError { status_code: 503 }),
        ]);
        let fetcher = fetcher_with(source, &store);

        let result = fetcher.fetch_all("lpr", &config(50)).await;

        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::ServerError {
                status_code: 503
            }))
        ));
        assert!(!store.exists());
        assert_eq!(fetcher.pacer().waits(), 1);
    }

    #[tokio::test]
    async fn test_error_leaves_existing_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("data.json");
        post_store::merge(&[child("kept")], &store).await.unwrap();
        let before = std::fs::read_to_string(&store).unwrap();

        let source = ScriptedSource::new(vec![Err(RedditApiError::InvalidResponse {
            details: "possible rate limit or block".to_string(),
        })]);
        let fetcher = fetcher_with(source, &store);

        assert!(fetcher.fetch_all("lpr", &config(50)).await.is_err());
        assert_eq!(std::fs::read_to_string(&store).unwrap(), before);
    }

    #[tokio::test]
    async fn test_refetch_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("data.json");

        for expected_added in [2, 0] {
            let source = ScriptedSource::new(vec![Ok(page(&["a", "b"], None))]);
            let summary = fetcher_with(source, &store)
                .fetch_all("lpr", &config(50))
                .await
                .unwrap();
            assert_eq!(
                summary.merge,
                MergeOutcome {
                    added: expected_added,
                    total: 2
                }
            );
        }
    }

    #[tokio::test]
    async fn test_saves_each_page() {
        let dir = TempDir::new().unwrap();
        let output_dir = dir.path().join("lpr-data");
        let source = ScriptedSource::new(vec![
            Ok(page(&["a", "b"], Some("t3_b"))),
            Ok(page(&["c"], None)),
        ]);
        let fetcher = fetcher_with(source, &dir.path().join("data.json"));
        let config = FetchConfig {
            save_each_page: true,
            output_dir: output_dir.clone(),
            ..FetchConfig::default()
        };

        fetcher.fetch_all("lpr", &config).await.unwrap();

        let first: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(output_dir.join("page-001.json")).unwrap())
                .unwrap();
        let second: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(output_dir.join("page-002.json")).unwrap())
                .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second, vec![child("c")]);
    }

    #[tokio::test]
    async fn test_page_save_failure_does_not_abort() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file in the way").unwrap();

        let source = ScriptedSource::new(vec![Ok(page(&["a"], None))]);
        let fetcher = fetcher_with(source, &dir.path().join("data.json"));
        let config = FetchConfig {
            save_each_page: true,
            output_dir: blocker.join("pages"),
            ..FetchConfig::default()
        };

        let summary = fetcher.fetch_all("lpr", &config).await.unwrap();
        assert_eq!(summary.merge.added, 1);
    }

    #[tokio::test]
    async fn test_page_size_is_capped() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(vec![Ok(page(&["a"], None))]);
        let fetcher = fetcher_with(source, &dir.path().join("data.json"));
        let config = FetchConfig {
            page_size: 500,
            ..FetchConfig::default()
        };

        fetcher.fetch_all("lpr", &config).await.unwrap();
        assert_eq!(fetcher.source().calls()[0].limit, 100);
    }

    // HTTP Client Tests
    #[derive(Clone, Default)]
    struct Seen {
        requests: Arc<Mutex<Vec<(HashMap<String, String>, Option<String>)>>>,
    }

    async fn spawn_server(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", address)
    }

    async fn listing_server() -> (String, Seen) {
        use axum::extract::{Query, State};
        use axum::http::HeaderMap;
        use axum::routing::get;
        use axum::Json;

        async fn listing(
            State(seen): State<Seen>,
            Query(params): Query<HashMap<String, String>>,
            headers: HeaderMap,
        ) -> Json<Value> {
            let user_agent = headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            seen.requests
                .lock()
                .unwrap()
                .push((params.clone(), user_agent));

            let body = match params.get("after").map(String::as_str) {
                None => json!({
                    "kind": "Listing",
                    "data": {"after": "t3_b", "children": [child("a"), child("b")]}
                }),
                Some("t3_b") => json!({
                    "kind": "Listing",
                    "data": {"after": null, "children": [child("c")]}
                }),
                Some(_) => json!({"kind": "Listing", "data": {"after": null, "children": []}}),
            };
            Json(body)
        }

        let seen = Seen::default();
        let router = axum::Router::new()
            .route("/r/{subreddit}/.json", get(listing))
            .with_state(seen.clone());
        (spawn_server(router).await, seen)
    }

    async fn status_server(
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        body: &'static str,
    ) -> String {
        use axum::http::{HeaderName, HeaderValue, StatusCode};
        use axum::response::IntoResponse;
        use axum::routing::get;

        let router = axum::Router::new().route(
            "/r/{subreddit}/.json",
            get(move || {
                let headers = headers.clone();
                async move {
                    let mut response =
                        (StatusCode::from_u16(status).unwrap(), body).into_response();
                    for (name, value) in headers {
                        response.headers_mut().insert(
                            HeaderName::from_static(name),
                            HeaderValue::from_static(value),
                        );
                    }
                    response
                }
            }),
        );
        spawn_server(router).await
    }

    #[tokio::test]
    async fn test_http_fetch_all_end_to_end() {
        let (base_url, seen) = listing_server().await;
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("config").join("data.json");

        let client = RedditApiClient::with_base_url(&base_url, "redditkeep-test/1.0").unwrap();
        let pacer = IntervalPacer::new(PacerConfig::fixed(Duration::from_millis(1)));
        let fetcher = PaginatedFetcher::new(client, pacer, Deduplicator::new(&store));

        let summary = fetcher.fetch_all("lpr", &FetchConfig::default()).await.unwrap();

        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(summary.termination, Termination::Exhausted);
        assert_eq!(summary.merge, MergeOutcome { added: 3, total: 3 });
        assert_eq!(fetcher.pacer().status().waits, 1);

        let requests = seen.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0.get("limit").map(String::as_str), Some("100"));
        assert!(!requests[0].0.contains_key("after"));
        assert_eq!(requests[1].0.get("after").map(String::as_str), Some("t3_b"));
        assert_eq!(requests[0].1.as_deref(), Some("redditkeep-test/1.0"));
    }

    #[tokio::test]
    async fn test_http_rate_limit_reads_retry_after() {
        let base_url = status_server(429, vec![("retry-after", "7")], "slow down").await;
        let client = RedditApiClient::with_base_url(&base_url, "ua").unwrap();

        let result = client.fetch_page("lpr", None, 100).await;
        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded {
                retry_after: 7
            }))
        ));
    }

    #[tokio::test]
    async fn test_http_status_mapping() {
        for status in [403u16, 404, 502, 418] {
            let base_url = status_server(status, Vec::new(), "nope").await;
            let client = RedditApiClient::with_base_url(&base_url, "ua").unwrap();

            let error = match client.fetch_page("lpr", None, 100).await {
                Err(CoreError::RedditApi(e)) => e,
                other => panic!("status {} gave {:?}", status, other),
            };
            assert_eq!(error.status_code(), Some(status));

            match status {
                403 => assert!(matches!(error, RedditApiError::Forbidden { .. })),
                404 => assert!(matches!(
                    error,
                    RedditApiError::SubredditNotFound { ref subreddit } if subreddit == "lpr"
                )),
                502 => assert!(matches!(
                    error,
                    RedditApiError::ServerError { status_code: 502 }
                )),
                _ => assert!(matches!(
                    error,
                    RedditApiError::RequestFailed { status_code: 418, .. }
                )),
            }
        }
    }

    #[tokio::test]
    async fn test_http_block_page_is_invalid_response() {
        let base_url = status_server(200, Vec::new(), "<html>whoa there, pardner!</html>").await;
        let client = RedditApiClient::with_base_url(&base_url, "ua").unwrap();

        let result = client.fetch_page("lpr", None, 100).await;
        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::InvalidResponse { .. }))
        ));
    }

    #[tokio::test]
    async fn test_http_failure_skips_merge() {
        let base_url = status_server(500, Vec::new(), "oops").await;
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("data.json");

        let client = RedditApiClient::with_base_url(&base_url, "ua").unwrap();
        let fetcher = PaginatedFetcher::new(
            client,
            IntervalPacer::new(PacerConfig::fixed(Duration::ZERO)),
            Deduplicator::new(&store),
        );

        assert!(fetcher.fetch_all("lpr", &FetchConfig::default()).await.is_err());
        assert!(!store.exists());
    }
}
