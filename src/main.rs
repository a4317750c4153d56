//! promgroup-exporter - Entry Point
//!
//! Small exporter process built on the library: binds its own metric
//! group and serves it for scraping. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Bind `ExporterMetrics` through an `Initializer` over a fresh registry
//! 4. Spawn the exporter on the configured address (/metrics + /live)
//! 5. Spawn the uptime refresh loop
//! 6. Wait for SIGINT → broadcast shutdown → join tasks

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use prometheus::{Gauge, Histogram, IntCounter, IntGauge, Registry};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use promgroup::adapters::metrics::MetricsExporter;
use promgroup::config;
use promgroup::{label_set, metric_group, Initializer, Metric};

label_set! {
    struct BuildInfo {
        #[meta(label = "version")]
        version: &'static str,
        #[meta(label = "instance", default = "unnamed")]
        instance: String,
    }
}

metric_group! {
    struct ProcessMetrics {
        #[meta(name = "start_time_seconds", help = "Start time of the process since unix epoch in seconds")]
        start_time: Metric<(), Gauge>,
        #[meta(name = "uptime_seconds", help = "Seconds since the process started")]
        uptime: Metric<(), Gauge>,
    }
}

metric_group! {
    struct ExporterMetrics {
        #[meta(name = "build_info", help = "Exporter build information, always 1")]
        build_info: Metric<BuildInfo, IntGauge>,
        #[meta(namespace = "process")]
        process: ProcessMetrics,
        #[meta(name = "refreshes_total", help = "Completed refresh iterations")]
        refreshes: Metric<(), IntCounter>,
        #[meta(name = "refresh_duration_seconds", help = "Refresh iteration duration", buckets = "0.00001,0.0001,0.001,0.01")]
        refresh_duration: Metric<(), Histogram>,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml").context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.exporter.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.exporter.name,
        version = env!("CARGO_PKG_VERSION"),
        namespace = %config.exporter.namespace,
        "Starting promgroup exporter"
    );

    // ── 3. Bind exporter metrics ────────────────────────────
    let registry = Registry::new();
    let initializer = Initializer::with_default_builders(registry.clone());
    let mut metrics = ExporterMetrics::default();
    initializer
        .bind(&mut metrics, &config.exporter.namespace)
        .context("Failed to bind exporter metrics")?;
    let metrics = Arc::new(metrics);

    let started = Instant::now();
    metrics
        .build_info
        .with(&BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            instance: config.exporter.name.clone(),
        })
        .set(1);
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    metrics.process.start_time.get().set(since_epoch);

    // ── 4. Shutdown channel + exporter task ─────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    let exporter = Arc::new(MetricsExporter::new(registry));
    let exporter_shutdown = shutdown_tx.subscribe();
    let bind_address = config.exporter.bind_address.clone();
    let exporter_handle = tokio::spawn(async move {
        if let Err(e) = exporter.serve(bind_address, exporter_shutdown).await {
            error!(error = %e, "Metrics exporter failed");
        }
    });

    // ── 5. Uptime refresh loop ──────────────────────────────
    let refresh_metrics = Arc::clone(&metrics);
    let refresh_every = Duration::from_secs(config.exporter.refresh_interval_seconds);
    let mut refresh_shutdown = shutdown_tx.subscribe();
    let refresh_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh_every);
        loop {
            tokio::select! {
                biased;
                _ = refresh_shutdown.recv() => break,
                _ = ticker.tick() => {
                    let tick = Instant::now();
                    refresh_metrics.process.uptime.get().set(started.elapsed().as_secs_f64());
                    refresh_metrics.refreshes.get().inc();
                    refresh_metrics.refresh_duration.get().observe(tick.elapsed().as_secs_f64());
                }
            }
        }
    });

    info!("All tasks spawned - exporter is running");

    // ── 6. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    let _ = shutdown_tx.send(());

    let _ = tokio::time::timeout(Duration::from_secs(5), refresh_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), exporter_handle).await;

    info!("Shutdown complete");
    Ok(())
}
