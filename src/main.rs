//! Marketplace Sync — Entry Point
//!
//! Initializes configuration, logging, the order store, and the
//! per-marketplace sync loops. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Connect the Postgres order store + run migrations
//! 4. Create the relay queue client
//! 5. Spawn observability server (/live + /ready + /metrics)
//! 6. Run the optional startup backfill (OpenSea, bounded window)
//! 7. Spawn one realtime loop per enabled marketplace
//! 8. Wait for SIGINT → graceful shutdown (signal→drain→exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use chrono::{DateTime, Utc};
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

use marketplace_sync::adapters::api::client::{ApiClientConfig, MarketplaceClient};
use marketplace_sync::adapters::api::looksrare::LooksRareFeed;
use marketplace_sync::adapters::api::opensea::OpenSeaFeed;
use marketplace_sync::adapters::metrics::MetricsRegistry;
use marketplace_sync::adapters::parsers::looksrare::LooksRareParser;
use marketplace_sync::adapters::parsers::wyvern::WyvernParser;
use marketplace_sync::adapters::persistence::PgOrderStore;
use marketplace_sync::adapters::relay::HttpRelayQueue;
use marketplace_sync::config::{self, BackfillConfig, MarketplaceConfig};
use marketplace_sync::usecases::looksrare::LooksRareSync;
use marketplace_sync::usecases::opensea::{OpenSeaSync, OpenSeaSyncOptions};

type OpenSeaEngine = OpenSeaSync<OpenSeaFeed, WyvernParser, PgOrderStore, HttpRelayQueue>;
type LooksRareEngine = LooksRareSync<LooksRareFeed, LooksRareParser, PgOrderStore, HttpRelayQueue>;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(&config.service.log_level)
            }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        opensea = config.opensea.enabled,
        looksrare = config.looksrare.enabled,
        "Starting marketplace sync"
    );

    // ── 3. Shutdown signal channels ─────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let (health_tx, health_rx) = watch::channel(true);

    // ── 4. Order store + relay queue ────────────────────────
    let store = PgOrderStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to initialize the order store")?;

    let relay = HttpRelayQueue::new(
        config.relay.base_url.clone(),
        config.relay.api_key.clone(),
        Duration::from_millis(config.relay.timeout_ms),
    )
    .context("Failed to create the relay queue client")?;

    // ── 5. Spawn observability server ───────────────────────
    let metrics = Arc::new(MetricsRegistry::new()?);
    let server_handle = if config.metrics.enabled {
        Some(tokio::spawn(serve_observability(
            config.metrics.bind_address.clone(),
            Arc::clone(&metrics),
            health_rx,
            shutdown_tx.subscribe(),
        )))
    } else {
        None
    };

    // ── 6. Optional startup backfill (OpenSea) ──────────────
    if let Some(backfill) = &config.backfill {
        if config.opensea.enabled {
            let engine = build_opensea_engine(&config.opensea, store.clone(), relay.clone())?;
            run_backfill(&engine, backfill, &metrics).await?;
        } else {
            warn!("backfill configured but opensea sync is disabled, skipping");
        }
    }

    // ── 7. Spawn one realtime loop per marketplace ──────────
    let opensea_handle = if config.opensea.enabled {
        let engine = build_opensea_engine(&config.opensea, store.clone(), relay.clone())?;
        Some(tokio::spawn(run_opensea_loop(
            config.opensea.clone(),
            engine,
            Arc::clone(&metrics),
            shutdown_tx.subscribe(),
        )))
    } else {
        warn!("opensea sync disabled");
        None
    };

    let looksrare_handle = if config.looksrare.enabled {
        let engine = build_looksrare_engine(&config.looksrare, store.clone(), relay.clone())?;
        Some(tokio::spawn(run_looksrare_loop(
            config.looksrare.clone(),
            engine,
            Arc::clone(&metrics),
            shutdown_tx.subscribe(),
        )))
    } else {
        warn!("looksrare sync disabled");
        None
    };

    info!("All tasks spawned — sync service is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    // Signal all tasks to stop and flip readiness to 503
    let _ = shutdown_tx.send(());
    let _ = health_tx.send(false);

    // A sync loop finishes its in-flight run before it notices the
    // signal; give it time to drain.
    for handle in [opensea_handle, looksrare_handle].into_iter().flatten() {
        let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
    }
    if let Some(handle) = server_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Build the offset-mode OpenSea engine from one marketplace config.
fn build_opensea_engine(
    cfg: &MarketplaceConfig,
    store: PgOrderStore,
    relay: HttpRelayQueue,
) -> Result<OpenSeaEngine> {
    let client = MarketplaceClient::new(ApiClientConfig::new(
        cfg.base_url.clone(),
        cfg.api_key.clone(),
        Duration::from_millis(cfg.timeout_ms),
    ))?;
    Ok(OpenSeaSync::new(
        OpenSeaFeed::new(client),
        WyvernParser,
        store,
        relay,
    ))
}

/// Build the cursor-mode LooksRare engine from one marketplace config.
fn build_looksrare_engine(
    cfg: &MarketplaceConfig,
    store: PgOrderStore,
    relay: HttpRelayQueue,
) -> Result<LooksRareEngine> {
    let client = MarketplaceClient::new(ApiClientConfig::new(
        cfg.base_url.clone(),
        cfg.api_key.clone(),
        Duration::from_millis(cfg.timeout_ms),
    ))?;
    Ok(LooksRareSync::new(
        LooksRareFeed::new(client),
        LooksRareParser,
        store,
        relay,
    ))
}

/// Run the configured OpenSea backfill window once, before the
/// realtime loops start. A failure here aborts startup — the window
/// must be re-run from the same bounds.
async fn run_backfill(
    engine: &OpenSeaEngine,
    backfill: &BackfillConfig,
    metrics: &MetricsRegistry,
) -> Result<()> {
    let listed_after = DateTime::from_timestamp(backfill.listed_after, 0)
        .context("backfill.listed_after out of range")?;
    let listed_before = backfill
        .listed_before
        .map(|secs| DateTime::from_timestamp(secs, 0).context("backfill.listed_before out of range"))
        .transpose()?;

    let run_id = Uuid::new_v4();
    info!(
        run_id = %run_id,
        listed_after = %listed_after,
        listed_before = ?listed_before,
        "starting opensea backfill"
    );

    let opts = OpenSeaSyncOptions {
        listed_after: Some(listed_after),
        listed_before,
        backfill: true,
        ..OpenSeaSyncOptions::default()
    };

    let started = Instant::now();
    match engine.sync(&opts).await {
        Ok(progress) => {
            metrics
                .sync_runs
                .with_label_values(&["opensea", "backfill"])
                .inc();
            metrics
                .sync_duration_seconds
                .with_label_values(&["opensea", "backfill"])
                .observe(started.elapsed().as_secs_f64());
            info!(run_id = %run_id, progress = ?progress, "opensea backfill complete");
            Ok(())
        }
        Err(e) => {
            metrics
                .sync_failures
                .with_label_values(&["opensea", "backfill"])
                .inc();
            Err(e.context("opensea backfill failed"))
        }
    }
}

/// Realtime OpenSea tailing: each run's window starts where the last
/// one observed progress, so nothing is lost across invocations.
async fn run_opensea_loop(
    cfg: MarketplaceConfig,
    engine: OpenSeaEngine,
    metrics: Arc<MetricsRegistry>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut listed_after: Option<DateTime<Utc>> = None;
    let mut ticker = interval(Duration::from_secs(cfg.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                info!("opensea loop received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                let run_id = Uuid::new_v4();
                let opts = OpenSeaSyncOptions {
                    listed_after,
                    ..OpenSeaSyncOptions::default()
                };

                let started = Instant::now();
                match engine.sync(&opts).await {
                    Ok(progress) => {
                        metrics.sync_runs.with_label_values(&["opensea", "realtime"]).inc();
                        metrics
                            .sync_duration_seconds
                            .with_label_values(&["opensea", "realtime"])
                            .observe(started.elapsed().as_secs_f64());
                        if let Some(created_at) = progress {
                            listed_after = Some(created_at);
                        }
                        info!(run_id = %run_id, progress = ?progress, "opensea realtime run complete");
                    }
                    Err(e) => {
                        metrics.sync_failures.with_label_values(&["opensea", "realtime"]).inc();
                        error!(run_id = %run_id, error = %e, "opensea realtime run failed");
                    }
                }
            }
        }
    }
}

/// Realtime LooksRare drain: each run pages until it hits already-seen
/// history. A failed run is retried wholesale on the next tick.
async fn run_looksrare_loop(
    cfg: MarketplaceConfig,
    engine: LooksRareEngine,
    metrics: Arc<MetricsRegistry>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_secs(cfg.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                info!("looksrare loop received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                let run_id = Uuid::new_v4();
                let started = Instant::now();
                match engine.sync_all().await {
                    Ok(()) => {
                        metrics.sync_runs.with_label_values(&["looks-rare", "drain"]).inc();
                        metrics
                            .sync_duration_seconds
                            .with_label_values(&["looks-rare", "drain"])
                            .observe(started.elapsed().as_secs_f64());
                        info!(run_id = %run_id, "looksrare drain complete");
                    }
                    Err(e) => {
                        metrics.sync_failures.with_label_values(&["looks-rare", "drain"]).inc();
                        error!(run_id = %run_id, error = %e, "looksrare drain failed");
                    }
                }
            }
        }
    }
}

/// Serve health and metrics endpoints.
///
/// - `/live`    — Liveness probe: 200 if the process is running
/// - `/ready`   — Readiness probe: 503 during graceful shutdown
/// - `/metrics` — Prometheus text exposition
async fn serve_observability(
    bind_address: String,
    metrics: Arc<MetricsRegistry>,
    health_rx: watch::Receiver<bool>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let app = Router::new()
        .route("/live", get(|| async { StatusCode::OK }))
        .route(
            "/ready",
            get(move || {
                let rx = health_rx.clone();
                async move {
                    if *rx.borrow() {
                        StatusCode::OK
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                }
            }),
        )
        .route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move { metrics.render() }
            }),
        );

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Observability server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    Ok(())
}
