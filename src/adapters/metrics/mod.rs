//! Metrics Adapters
//!
//! Prometheus metrics for the sync scheduler, served next to the
//! health probes by the axum server wired in `main`.

pub mod prometheus;

pub use prometheus::MetricsRegistry;
