//! Prometheus Metrics Registry - Sync Observability
//!
//! Counters and histograms the scheduler records around each sync
//! entry-point invocation. All metrics follow the naming convention
//! `marketplace_sync_*` and carry `source`/`mode` labels so realtime
//! tailing and backfills can be graphed apart.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Centralized Prometheus metrics for the sync scheduler.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Completed sync runs counter.
    pub sync_runs: IntCounterVec,
    /// Failed sync runs counter.
    pub sync_failures: IntCounterVec,
    /// Wall-clock duration of one sync run (seconds).
    pub sync_duration_seconds: HistogramVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let sync_runs = IntCounterVec::new(
            Opts::new("marketplace_sync_runs_total", "Completed sync runs"),
            &["source", "mode"],
        )?;

        let sync_failures = IntCounterVec::new(
            Opts::new("marketplace_sync_failures_total", "Failed sync runs"),
            &["source", "mode"],
        )?;

        let sync_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "marketplace_sync_duration_seconds",
                "Wall-clock duration of one sync run",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
            &["source", "mode"],
        )?;

        registry.register(Box::new(sync_runs.clone()))?;
        registry.register(Box::new(sync_failures.clone()))?;
        registry.register(Box::new(sync_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            sync_runs,
            sync_failures,
            sync_duration_seconds,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
