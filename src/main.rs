use anyhow::Context;
use background_service::BackgroundService;
use clap::{Parser, Subcommand};
use post_store::{convert_file, PostStore, SystemClock};
use reddit_client::RedditFetcher;
use redditkeep_core::{AppConfig, CoreError, ErrorExt};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use web::AppState;

const DEFAULT_LOG_FILTER: &str =
    "redditkeep=info,reddit_client=info,post_store=info,web=info,background_service=info";

#[derive(Parser, Debug)]
#[command(author, version, about = "Archive subreddit posts and browse them over HTTP")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every page of the given subreddits and merge them into the store.
    Fetch {
        /// Subreddits to fetch; defaults to the configured list.
        subreddits: Vec<String>,
        #[arg(long)]
        max_pages: Option<u32>,
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Also write each raw page to the output directory.
        #[arg(long)]
        save_pages: bool,
    },
    /// Serve the stored posts.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Normalize a raw JSON array of posts into the stored shape.
    Normalize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    match cli.command {
        Command::Fetch {
            subreddits,
            max_pages,
            delay_ms,
            save_pages,
        } => {
            if !subreddits.is_empty() {
                config.subreddits = subreddits;
            }
            if let Some(max_pages) = max_pages {
                config.fetch.max_pages = max_pages;
            }
            if let Some(delay_ms) = delay_ms {
                config.fetch.delay_ms = delay_ms;
            }
            config.fetch.save_each_page |= save_pages;
            config.validate().context("invalid fetch options")?;
            fetch(config).await
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate().context("invalid server options")?;
            serve(config).await
        }
        Command::Normalize { input, output } => {
            let count = convert_file(&input, &output)
                .await
                .map_err(report)
                .with_context(|| format!("failed to normalize {}", input.display()))?;
            tracing::info!("Wrote {} normalized posts to {}", count, output.display());
            Ok(())
        }
    }
}

async fn fetch(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        "Fetching {} subreddits into {}",
        config.subreddits.len(),
        config.store_path.display()
    );

    let fetcher = RedditFetcher::from_config(&config).map_err(report)?;
    let service = BackgroundService::new(
        fetcher,
        config.subreddits.clone(),
        config.fetch.clone(),
        config.batch_policy,
    );

    let batch = service.run_once().await.map_err(report)?;
    for outcome in &batch.outcomes {
        tracing::info!("{}", serde_json::to_string(outcome)?);
    }
    if batch.failures() > 0 {
        anyhow::bail!("{} subreddits failed to fetch", batch.failures());
    }
    Ok(())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let store = PostStore::with_clock(
        &config.store_path,
        config.cache.freshness_window(),
        SystemClock,
    );
    let app = web::router(AppState::new(store));

    let listener = bind(&config.server.host, config.server.port).await?;
    let addr = listener.local_addr().context("failed to read listen address")?;

    tracing::info!("Server running at http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// Bind the listener, resolving `host` so names like `localhost` work.
async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))
}

fn report(error: CoreError) -> anyhow::Error {
    tracing::error!("{}", error.user_friendly_message());
    anyhow::Error::new(error)
}
