//! Configuration Module - TOML-based Sync Configuration
//!
//! Loads and validates configuration from `config.toml`. Marketplace
//! endpoints, credentials, and cadences are externalized here —
//! nothing is hardcoded in the sync core.

pub mod loader;

use serde::Deserialize;

/// Top-level sync service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before any sync loop starts.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  pub service: ServiceConfig,
  /// Order store connection.
  pub database: DatabaseConfig,
  /// Downstream relay queue endpoint.
  pub relay: RelayConfig,
  /// OpenSea feed endpoint and cadence.
  pub opensea: MarketplaceConfig,
  /// LooksRare feed endpoint and cadence.
  pub looksrare: MarketplaceConfig,
  /// Optional one-off backfill run before the realtime loops start.
  pub backfill: Option<BackfillConfig>,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Order store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
  /// Postgres connection URL.
  pub url: String,
  /// Connection pool size.
  #[serde(default = "default_max_connections")]
  pub max_connections: u32,
}

/// Relay queue configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
  /// Relay service base URL, no trailing slash.
  pub base_url: String,
  /// Optional API key forwarded with every batch.
  pub api_key: Option<String>,
  /// Request timeout in milliseconds.
  #[serde(default = "default_relay_timeout_ms")]
  pub timeout_ms: u64,
}

/// One marketplace's feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
  /// API base URL, no trailing slash.
  pub base_url: String,
  /// Optional API key sent as `X-API-KEY`.
  pub api_key: Option<String>,
  /// Page-fetch timeout in milliseconds. Must stay within 10–20 s.
  #[serde(default = "default_fetch_timeout_ms")]
  pub timeout_ms: u64,
  /// Seconds between realtime sync invocations.
  #[serde(default = "default_interval_secs")]
  pub interval_secs: u64,
  /// Whether this marketplace is synced at all.
  #[serde(default = "default_true")]
  pub enabled: bool,
}

/// Startup backfill window (OpenSea, offset mode).
#[derive(Debug, Clone, Deserialize)]
pub struct BackfillConfig {
  /// Lower creation-time bound, unix seconds.
  pub listed_after: i64,
  /// Upper creation-time bound, unix seconds; open-ended if absent.
  pub listed_before: Option<i64>,
}

/// Metrics and health endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable the metrics/health server.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Bind address for `/live`, `/ready`, and `/metrics`.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_max_connections() -> u32 {
  5
}

fn default_relay_timeout_ms() -> u64 {
  10_000
}

fn default_fetch_timeout_ms() -> u64 {
  15_000
}

fn default_interval_secs() -> u64 {
  60
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}
