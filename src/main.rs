use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::time::Duration;

use ximalaya_feed::cache::FeedCache;
use ximalaya_feed::config::Config;
use ximalaya_feed::feed::{render_rss, FeedRequest};
use ximalaya_feed::pipeline::{AlbumFeedBuilder, BuildOutcome, ErrorKind, FeedError};
use ximalaya_feed::platform::{build_http_client, PlatformClient};

/// Default config path (~/.config/ximalaya-feed/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("ximalaya-feed")
        .join("config.toml"))
}

/// Atomically write a file using write-to-temp-then-rename.
/// The destination is never left in a partial state.
fn atomic_write(dst: &Path, content: &[u8]) -> Result<()> {
    // Unpredictable temp name, created with create_new so a planted symlink fails the open
    let temp_path = dst.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| {
            format!(
                "Failed to create temporary file '{}': check directory permissions or disk space",
                temp_path.display()
            )
        })?;

    temp_file.write_all(content).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to write to temporary file '{}': disk may be full",
            temp_path.display()
        )
    })?;

    temp_file.sync_all().with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to sync temporary file '{}' to disk: disk may be full",
            temp_path.display()
        )
    })?;

    drop(temp_file);

    // On Windows, rename fails if destination exists
    #[cfg(windows)]
    if dst.exists() {
        std::fs::remove_file(dst).with_context(|| {
            let _ = std::fs::remove_file(&temp_path);
            format!(
                "Failed to remove existing '{}' before atomic replace",
                dst.display()
            )
        })?;
    }

    std::fs::rename(&temp_path, dst).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to rename '{}' to '{}': check permissions",
            temp_path.display(),
            dst.display()
        )
    })?;

    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "ximalaya-feed",
    about = "Build a podcast RSS feed from a Ximalaya album"
)]
struct Args {
    /// Album id, as in https://www.ximalaya.com/album/<ID>
    album_id: String,

    /// Category slug used in the feed link
    #[arg(long = "type", default_value = "album")]
    album_type: String,

    /// List every page: `true`, `1` or `all`
    #[arg(long, value_name = "VALUE")]
    all: Option<String>,

    /// Fetch rich show-notes: `true`, `1` or `shownote`
    #[arg(long, value_name = "VALUE")]
    shownote: Option<String>,

    /// Config file (default: ~/.config/ximalaya-feed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write to FILE instead of stdout
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit the feed object as JSON instead of RSS
    #[arg(long)]
    json: bool,

    /// Rebuild every SECS seconds until interrupted
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the feed
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let endpoints = config.endpoints().context("Invalid platform URL in config")?;
    let http = build_http_client(config.request_timeout()).context("Failed to build HTTP client")?;
    let client = PlatformClient::new(http, endpoints, config.request_timeout());
    let cache = FeedCache::new(config.cache_capacity, config.cache_ttl());

    let builder = AlbumFeedBuilder::new(
        client,
        &cache,
        config.build_options(),
        config.category_table(),
        config.credential(),
    );

    let request = FeedRequest::from_params(
        &args.album_type,
        &args.album_id,
        args.all.as_deref(),
        args.shownote.as_deref(),
    );

    let Some(secs) = args.interval else {
        return run_once(&builder, &request, &args).await;
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    };
    rebuild_until(Duration::from_secs(secs.max(1)), shutdown, || {
        run_once(&builder, &request, &args)
    })
    .await;
    Ok(())
}

/// Runs `rebuild` every `period` until `shutdown` resolves.
///
/// `shutdown` is polled during a rebuild too, so an interrupt never waits
/// for the platform. A failed rebuild is logged and the loop carries on.
async fn rebuild_until<S, F, Fut>(period: Duration, shutdown: S, mut rebuild: F)
where
    S: Future<Output = ()>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut shutdown = pin!(shutdown);
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                tokio::select! {
                    result = rebuild() => {
                        if let Err(e) = result {
                            tracing::error!(error = %format!("{e:#}"), "Feed rebuild failed");
                        }
                    }
                    _ = &mut shutdown => break,
                }
            }
        }
    }
    tracing::info!("Interrupted, exiting");
}

async fn run_once(builder: &AlbumFeedBuilder, request: &FeedRequest, args: &Args) -> Result<()> {
    // Skipped tracks are already reported through tracing
    let BuildOutcome { feed, .. } = builder
        .build(request)
        .await
        .map_err(|e| describe_failure(e, &request.album_id))?;

    let body = if args.json {
        serde_json::to_string_pretty(&feed).context("Failed to serialize feed as JSON")?
    } else {
        render_rss(&feed)?
    };

    match &args.output {
        Some(path) => atomic_write(path, body.as_bytes())
            .with_context(|| format!("Failed to write feed to {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(body.as_bytes())
                .and_then(|_| stdout.write_all(b"\n"))
                .context("Failed to write feed to stdout")?;
        }
    }
    Ok(())
}

fn describe_failure(err: FeedError, album_id: &str) -> anyhow::Error {
    match err.kind() {
        ErrorKind::NotFound => anyhow::anyhow!("Album {album_id} not found on the platform"),
        ErrorKind::Transport => {
            anyhow::Error::new(err).context(format!("Failed to fetch album {album_id}"))
        }
    }
}
