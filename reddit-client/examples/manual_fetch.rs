use reddit_client::{
    FetchConfig, IntervalPacer, ListingSource, PacerConfig, PaginatedFetcher, RedditApiClient,
};
use post_store::Deduplicator;
use std::io::{self, Write};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("=== Reddit Listing Manual Test ===\n");

    print!("Subreddit to fetch (without r/): ");
    io::stdout().flush()?;
    let mut subreddit = String::new();
    io::stdin().read_line(&mut subreddit)?;
    let subreddit = subreddit.trim().trim_start_matches("r/").to_string();

    if subreddit.is_empty() {
        println!("❌ Subreddit cannot be empty.");
        return Ok(());
    }

    let client = RedditApiClient::new("redditkeep/0.1 manual test")?;

    // Test 1: a single page, no store involved
    println!("📰 Getting first page of r/{}...", subreddit);
    match client.fetch_page(&subreddit, None, 5).await {
        Ok(page) => {
            println!("✅ Found {} posts, next cursor: {:?}", page.children.len(), page.after);
            for (i, post) in page.children.iter().enumerate() {
                let title = post["data"]["title"].as_str().unwrap_or("(untitled)");
                println!("   {}. {}", i + 1, title);
            }
            println!();
        }
        Err(e) => {
            println!("❌ Failed to get posts: {}\n", e);
            return Ok(());
        }
    }

    // Test 2: two paced pages merged into a scratch store
    let scratch = std::env::temp_dir().join(format!("redditkeep-manual-{}", subreddit));
    let store = scratch.join("data.json");
    let fetcher = PaginatedFetcher::new(
        client,
        IntervalPacer::new(PacerConfig::reddit_public()),
        Deduplicator::new(&store),
    );
    let config = FetchConfig {
        max_pages: 2,
        save_each_page: true,
        output_dir: PathBuf::from(&scratch).join("pages"),
        ..FetchConfig::default()
    };

    println!("🔄 Fetching up to {} pages into {}...", config.max_pages, store.display());
    let summary = fetcher.fetch_all(&subreddit, &config).await?;
    println!("✅ Pages fetched: {}", summary.pages_fetched);
    println!("   Termination: {:?}", summary.termination);
    println!("   Last cursor: {:?}", summary.last_cursor);
    println!("   Added {} posts ({} total)", summary.merge.added, summary.merge.total);

    println!("\n🚦 Pacer status: {:?}", fetcher.pacer().status());
    println!("\n🎉 Manual test completed successfully!");
    Ok(())
}
