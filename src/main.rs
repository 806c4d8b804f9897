mod cli;

use episonext::{
    config,
    events::{EventBus, EventKind},
    metadata::{EnrichmentPipeline, TmdbProvider},
    monitor::Monitor,
    watchlist::WatchItem,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "episonext=debug,episonext_common=debug".to_string()
        } else {
            "episonext=info,episonext_common=info".to_string()
        }
    });

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Enrich { items, pretty } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(enrich_file(&items, cli.config.as_deref(), pretty))
        }
        Commands::Monitor {
            items,
            interval,
            once,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(monitor_file(&items, cli.config.as_deref(), interval, once))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("episonext {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn read_items(path: &Path) -> Result<Vec<WatchItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read watch list: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse watch list: {:?}", path))
}

fn build_pipeline(config: &config::Config) -> Arc<EnrichmentPipeline> {
    let provider = Arc::new(TmdbProvider::from_config(&config.tmdb));
    Arc::new(EnrichmentPipeline::with_settings(
        provider,
        config.enrichment.settings(),
    ))
}

async fn enrich_file(items_path: &Path, config_path: Option<&Path>, pretty: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let items = read_items(items_path)?;
    tracing::info!(items = items.len(), "Enriching watch list");

    let pipeline = build_pipeline(&config);
    let enriched = pipeline.enrich(&items).await;

    let output = if pretty {
        serde_json::to_string_pretty(&enriched)?
    } else {
        serde_json::to_string(&enriched)?
    };
    println!("{output}");
    Ok(())
}

async fn monitor_file(
    items_path: &Path,
    config_path: Option<&Path>,
    interval: Option<u64>,
    once: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let items = read_items(items_path)?;

    let pipeline = build_pipeline(&config);
    let bus = Arc::new(EventBus::default());
    let monitor = Monitor::with_settings(pipeline, Arc::clone(&bus), config.monitor.settings());

    if once {
        monitor.update_watched_series(items);
        let emitted = monitor.check_now().await;
        let mut events = bus.recent_events(emitted);
        events.reverse();
        for event in events {
            println!("{}", serde_json::to_string(&event)?);
        }
        return Ok(());
    }

    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.monitor.polling_interval());
    let mut events = bus.subscribe_to(&[
        EventKind::UpcomingEpisode,
        EventKind::NextEpisodeAvailable,
        EventKind::MonitoringError,
    ]);
    monitor.start(items, interval);
    tracing::info!(
        series = monitor.watched_series().len(),
        "Monitoring; press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = events.recv() => match received {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event output fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("Shutting down...");
    monitor.stop();
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!(
                "  TMDB API key: {}",
                if config.tmdb.api_key.is_empty() { "missing" } else { "set" }
            );
            println!("  Language: {}", config.tmdb.language);
            println!(
                "  Completion threshold: {}",
                config.enrichment.completion_threshold
            );
            println!(
                "  Cache expiration: {}s",
                config.enrichment.cache_expiration_ms / 1000
            );
            println!(
                "  Polling interval: {}s",
                config.monitor.polling_interval_secs
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!(
                "  Completion threshold: {}",
                config.enrichment.completion_threshold
            );
            println!(
                "  Polling interval: {}s",
                config.monitor.polling_interval_secs
            );
        }
    }

    Ok(())
}
