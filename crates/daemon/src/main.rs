use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use titlecast_daemon::{
    config, setup, Bridge, DiscordPublisher, FeedTiming, StatusFeed, TitleCache,
    TitleResolver,
};
use titlecast_lookup_client::LookupClient;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Mirror the title running on your console as Discord rich presence.
#[derive(Debug, Parser)]
#[command(name = "titlecast", version, about)]
struct Cli {
    /// Config file (default: platform config dir, or $TITLECAST_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Title cache document (default: platform data dir, or $TITLECAST_CACHE)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Re-run the interactive setup before starting
    #[arg(long)]
    setup: bool,

    /// Don't seed an empty title cache from the remote snapshot
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("titlecast fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("titlecast=info,titlecast_daemon=info,titlecast_lookup_client=info,warn")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<()> {
    info!("titlecast starting");

    let config_path = match cli.config {
        Some(path) => path,
        None => titlecast_paths::config_path()?,
    };
    let cfg = config::resolve_config(&config_path, cli.setup, setup::can_prompt(), |name| {
        std::env::var(name).ok()
    })?;
    let app_id = cfg.application_id()?;

    let cache_path = match cli.cache {
        Some(path) => path,
        None => titlecast_paths::cache_path(&cfg.cache.path)?,
    };
    let lookup = LookupClient::new(cfg.lookup.clone())?;
    let seed = (!cli.no_seed).then_some(&lookup);
    let cache = TitleCache::load(cache_path, seed).await;

    let connect = DiscordPublisher::connect(
        app_id,
        Duration::from_secs(cfg.presence.retry_delay_secs),
        Duration::from_secs(cfg.presence.handshake_timeout_secs),
    );
    let publisher = tokio::select! {
        publisher = connect => publisher,
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received before Discord connected");
            return Ok(());
        }
    };

    let feed = StatusFeed::new(cfg.console.address(), FeedTiming::from(&cfg.feed));
    let resolver = TitleResolver::new(lookup, cache);
    let mut bridge = Bridge::new(feed, resolver, publisher, cfg.presence.buttons_enabled);

    tokio::select! {
        _ = bridge.run() => {}
        _ = wait_for_shutdown() => info!("Shutdown signal received, stopping..."),
    }

    bridge.clear_presence().await;
    bridge.into_sink().shutdown().await;

    info!("titlecast stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
            }
            _ => {
                warn!("Failed to register signal handlers, falling back to Ctrl+C");
                ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C");
    } else {
        // Without a handler the process runs until killed.
        std::future::pending::<()>().await;
    }
}
