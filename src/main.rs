//! Order-book zone watcher entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use zonewatch::analysis::AggregationEngine;
use zonewatch::api::{create_router, AppState};
use zonewatch::book::{BookStore, BookSynchronizer};
use zonewatch::config::Config;
use zonewatch::feed::client::FuturesFeedClient;
use zonewatch::feed::stream::ReconnectConfig;
use zonewatch::ingest::IngestionWorker;
use zonewatch::metrics;
use zonewatch::notify::ConsoleNotifier;
use zonewatch::persist::PersistenceScheduler;
use zonewatch::utils::shutdown_signal;

/// Order-book zone watcher for Binance USDⓈ-M futures.
#[derive(Parser, Debug)]
#[command(name = "zonewatch")]
#[command(about = "Reconstructs futures order books and reports high-volume zones")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port for health/metrics.
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run ingestion, persistence, and analysis together (default).
    Run {
        /// HTTP server port for health/metrics.
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Run the analysis loop over an existing persisted registry.
    Analyze {
        /// Run one cycle and exit instead of looping.
        #[arg(long)]
        once: bool,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Show the symbol set the current thresholds select.
    Symbols,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("zonewatch=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Symbols) => cmd_symbols().await,
        Some(Command::Analyze { once }) => cmd_analyze(once).await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(args.port).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("ZONEWATCH - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    if config.symbols.is_empty() {
        println!("  Symbols: auto-select");
        println!("  Quote Volume Floor: {}", config.quote_volume_floor);
        println!("  Price Ceiling: {}", config.price_ceiling);
    } else {
        println!("  Symbols: {}", config.symbols_upper().join(", "));
    }
    println!("  Depth Limit: {}", config.depth_limit);
    println!("  Persist: every {}s to {}", config.persist_interval_s, config.persist_path);
    println!("  Aggregation: every {}s", config.aggregation_interval_s);
    println!("  Zones: top {} per side, skip {} near touch", config.top_zones, config.near_touch_skip);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Show the symbol set the current thresholds select.
async fn cmd_symbols() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let feed = FuturesFeedClient::new(&config);
    let symbols = resolve_symbols(&feed, &config).await?;

    println!("Tracking {} symbols:", symbols.len());
    for symbol in &symbols {
        let price = feed.last_price(symbol).await;
        let tick = feed.tick_size(symbol).await;
        match (price, tick) {
            (Ok(price), Ok(tick)) => {
                println!("  {}  price={}  tick_size={}", symbol, price, tick)
            }
            (Ok(price), Err(_)) => println!("  {}  price={}", symbol, price),
            _ => println!("  {}", symbol),
        }
    }

    Ok(())
}

/// Run the analysis loop on its own.
async fn cmd_analyze(once: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    metrics::init_metrics();

    let feed = Arc::new(FuturesFeedClient::new(&config));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let engine = AggregationEngine::new(feed, Arc::new(ConsoleNotifier), &config, shutdown_rx);

    if once {
        engine.cycle().await;
        return Ok(());
    }

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    engine.run().await;
    Ok(())
}

/// Run the full pipeline.
async fn cmd_run(port: u16) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    // Initialize metrics
    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;
    metrics::init_metrics();

    // Resolve the symbol set once; the registry never resizes after this.
    let feed = Arc::new(FuturesFeedClient::new(&config));
    let symbols = resolve_symbols(&feed, &config).await?;
    info!(count = symbols.len(), symbols = ?symbols, "tracking symbols");

    let store = Arc::new(BookStore::new(&symbols));
    let sync = BookSynchronizer::new(feed.clone(), store.clone());

    // Shutdown fan-out
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start HTTP server
    let app_state = AppState::new(store.clone()).with_prometheus(prometheus);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let mut server_shutdown = shutdown_rx.clone();
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    // Spawn one ingestion worker per symbol
    let reconnect =
        ReconnectConfig::from_config(config.ws_reconnect_max_delay_s, config.ws_read_timeout_s);

    let mut worker_handles = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        let worker = IngestionWorker::new(
            symbol.clone(),
            config.ws_url.clone(),
            store.clone(),
            sync.clone(),
            reconnect.clone(),
            shutdown_rx.clone(),
        );
        worker_handles.push(tokio::spawn(worker.run()));
    }

    // Spawn the persistence scheduler
    let scheduler = PersistenceScheduler::new(
        store.clone(),
        config.persist_path.clone(),
        Duration::from_secs(config.persist_interval_s),
        shutdown_rx.clone(),
        app_state.last_persist_at.clone(),
    );
    let persist_handle = tokio::spawn(scheduler.run());

    // Spawn the aggregation engine
    let engine = AggregationEngine::new(
        feed.clone(),
        Arc::new(ConsoleNotifier),
        &config,
        shutdown_rx.clone(),
    );
    let engine_handle = tokio::spawn(engine.run());

    app_state.set_ready(true);
    info!("========================================");
    info!("ZONEWATCH STARTED");
    info!("========================================");
    info!("Symbols: {}", symbols.len());
    info!("Persist: every {}s to {}", config.persist_interval_s, config.persist_path);
    info!("Aggregation: every {}s", config.aggregation_interval_s);
    info!("========================================");

    // Wait for shutdown, then drain every task; the scheduler performs
    // its final flush on the way out.
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    for handle in worker_handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "ingestion worker join failed");
        }
    }
    if let Err(e) = engine_handle.await {
        warn!(error = %e, "aggregation engine join failed");
    }
    if let Err(e) = persist_handle.await {
        warn!(error = %e, "persistence scheduler join failed");
    }

    info!("shutdown complete");
    Ok(())
}

/// The tracked symbol set: explicit config override, or threshold
/// selection against the 24h tickers.
async fn resolve_symbols(
    feed: &FuturesFeedClient,
    config: &Config,
) -> anyhow::Result<Vec<String>> {
    if !config.symbols.is_empty() {
        return Ok(config.symbols_upper());
    }

    let symbols = feed.select_symbols(config).await?;
    Ok(symbols)
}
