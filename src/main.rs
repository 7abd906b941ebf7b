use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crier::api::Subscriptions;
use crier::chat::WebhookClient;
use crier::config::Config;
use crier::engine::scheduler;
use crier::feed::{Fetcher, USER_AGENT};
use crier::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "crier", about = "Feed-to-chat notifier: announces new feed items to chat channels")]
struct Cli {
    /// Path to the config file
    #[arg(long, default_value = "crier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the notifier daemon
    Run,
    /// Subscribe a channel to a feed URL
    Subscribe { channel: String, url: String },
    /// Remove a channel's subscription to a feed URL
    Unsubscribe { channel: String, url: String },
    /// List a channel's subscriptions
    List { channel: String },
    /// Fetch a URL and show its latest item without subscribing
    Preview { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    // RUST_LOG wins; otherwise the config debug flag picks the default filter
    let default_filter = if config.debug { "crier=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let db = Database::open(&config.database_path)
        .await
        .context("failed to open database")?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")?;
    let fetcher = Fetcher::new(client.clone(), Duration::from_secs(config.fetch_timeout_secs));
    let api = Subscriptions::new(db.clone(), fetcher.clone())
        .allow_private_hosts(config.allow_private_feeds);

    match cli.command {
        Command::Run => run_daemon(config, db, fetcher, client).await,
        Command::Subscribe { channel, url } => match api.subscribe(&url, &channel).await {
            Ok(sub) => {
                println!("Subscribed to {} ({})", sub.title, sub.link);
                Ok(())
            }
            Err(e) => fail(e),
        },
        Command::Unsubscribe { channel, url } => match api.unsubscribe(&url, &channel).await {
            Ok(_) => {
                // Absence of a match is not an error: the end state is the same
                println!("Unsubscribed");
                Ok(())
            }
            Err(e) => fail(e),
        },
        Command::List { channel } => match api.list(&channel).await {
            Ok(feeds) if feeds.is_empty() => {
                println!("No subscriptions");
                Ok(())
            }
            Ok(feeds) => {
                for feed in feeds {
                    println!("- {} ({})", feed.title, feed.link);
                }
                Ok(())
            }
            Err(e) => fail(e),
        },
        Command::Preview { url } => match api.preview(&url).await {
            Ok(preview) => {
                println!("Latest from {}: {}", preview.feed_title, preview.latest_title);
                if let Some(link) = preview.latest_link {
                    println!("{}", link);
                }
                Ok(())
            }
            Err(e) => fail(e),
        },
    }
}

/// Management errors are user-facing by design; print the message, not a
/// debug chain.
fn fail(err: crier::api::ApiError) -> Result<()> {
    eprintln!("{}", err);
    std::process::exit(1);
}

async fn run_daemon(
    config: Config,
    db: Database,
    fetcher: Fetcher,
    client: reqwest::Client,
) -> Result<()> {
    if config.channels.is_empty() {
        tracing::warn!("no [channels] routes configured, notifications will be dropped");
    }

    let chat = Arc::new(WebhookClient::new(client, config.channels.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = tokio::spawn(scheduler::run(
        db,
        fetcher,
        chat,
        Duration::from_secs(config.poll_interval_secs),
        shutdown_rx,
    ));

    shutdown_signal().await;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);
    scheduler.await.context("scheduler task panicked")?;

    Ok(())
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
