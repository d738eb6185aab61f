//! Order types shared by the sync core and the ports.
//!
//! Defines the store row, the normalized order produced by parsing, the
//! relay envelope, and the `RawOrder` accessor trait every marketplace
//! wire type implements so a row can be built even when parsing fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Address recorded as a row's target when neither the parser nor the
/// raw payload offers a contract address.
pub const NULL_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ────────────────────────────────────────────
// Marketplace and protocol tags
// ────────────────────────────────────────────

/// Upstream marketplace an order was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSource {
    #[serde(rename = "opensea")]
    OpenSea,
    #[serde(rename = "looks-rare")]
    LooksRare,
}

impl OrderSource {
    /// Constant tag persisted in the `source` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenSea => "opensea",
            Self::LooksRare => "looks-rare",
        }
    }
}

impl std::fmt::Display for OrderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol an order settles through. Forwarded downstream with the
/// order's parameters so consumers pick the right fulfillment path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    #[serde(rename = "wyvern-v2.3")]
    WyvernV23,
    #[serde(rename = "looks-rare")]
    LooksRare,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WyvernV23 => "wyvern-v2.3",
            Self::LooksRare => "looks-rare",
        }
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────
// Parsed and persisted order shapes
// ────────────────────────────────────────────

/// A marketplace order reduced to its protocol essentials.
///
/// Produced once per raw order by an `OrderParser`; never persisted
/// directly — only `kind` and `params` travel downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOrder {
    /// Protocol kind tag.
    pub kind: OrderKind,
    /// Canonical target contract address, lower-cased.
    pub target: String,
    /// Protocol-specific parameters, opaque to the sync core.
    pub params: serde_json::Value,
}

/// The `{kind, data}` envelope the relay queue accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEnvelope {
    pub kind: OrderKind,
    pub data: serde_json::Value,
}

impl From<NormalizedOrder> for OrderEnvelope {
    fn from(order: NormalizedOrder) -> Self {
        Self {
            kind: order.kind,
            data: order.params,
        }
    }
}

/// The unit persisted to the order store.
///
/// `hash` is the store-wide uniqueness key; an insert that collides is a
/// no-op, never an overwrite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRow {
    /// Lower-cased order identifier.
    pub hash: String,
    /// Lower-cased contract address — the parsed order's contract when
    /// parsing succeeded, otherwise the raw payload's fallback.
    pub target: String,
    /// Lower-cased maker address.
    pub maker: String,
    /// Upstream creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Raw (or raw-minus-heavy-fields) payload, retained for audit/replay.
    pub data: serde_json::Value,
    /// Set on OpenSea rows only: true unless the row came from a one-shot
    /// "live" fetch, signalling asynchronous downstream reconciliation.
    pub delayed: Option<bool>,
    /// Marketplace tag.
    pub source: OrderSource,
}

// ────────────────────────────────────────────
// Wire-order accessors
// ────────────────────────────────────────────

/// Accessors a marketplace wire order must expose so the pagination
/// driver can build a store row regardless of parse outcome.
pub trait RawOrder: Send + Sync {
    /// Upstream order hash, case as received.
    fn hash(&self) -> &str;

    /// Maker address, case as received.
    fn maker(&self) -> &str;

    /// Upstream creation timestamp.
    fn created_at(&self) -> DateTime<Utc>;

    /// Best-effort target when parsing fails: the first offered asset's
    /// contract address, or [`NULL_ADDRESS`] if the payload carries none.
    fn fallback_target(&self) -> String;

    /// Payload persisted in the row's `data` column, minus oversized
    /// fields the marketplace attaches.
    fn stored_data(&self) -> serde_json::Value;

    /// Marketplace this order came from.
    fn source(&self) -> OrderSource;
}

/// Build the store row for one raw order.
///
/// Parse failure only affects the target fallback — the order is never
/// dropped from persistence.
pub fn build_row<R: RawOrder>(
    raw: &R,
    parsed: Option<&NormalizedOrder>,
    delayed: Option<bool>,
) -> OrderRow {
    let target = match parsed {
        Some(order) => order.target.clone(),
        None => raw.fallback_target(),
    };

    OrderRow {
        hash: raw.hash().to_lowercase(),
        target: target.to_lowercase(),
        maker: raw.maker().to_lowercase(),
        created_at: raw.created_at(),
        data: raw.stored_data(),
        delayed,
        source: raw.source(),
    }
}

// ────────────────────────────────────────────
// Pagination state
// ────────────────────────────────────────────

/// Per-marketplace pagination position, created at the start of a sync
/// call, threaded through successive page fetches, and discarded when
/// the call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePosition {
    /// Monotonically increasing result-set offset; advanced by the caller.
    Offset(u64),
    /// Opaque server-issued continuation token; `None` starts from the
    /// newest page.
    Cursor(Option<String>),
}

/// Time-window bounds and page size for one page fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// Page size requested from the upstream.
    pub limit: usize,
    /// Lower creation-time bound (exclusive), if any.
    pub listed_after: Option<DateTime<Utc>>,
    /// Upper creation-time bound (exclusive), if any.
    pub listed_before: Option<DateTime<Utc>>,
}

/// One page of raw orders, newest first.
#[derive(Debug, Clone)]
pub struct Page<R> {
    pub orders: Vec<R>,
    /// Marketplace-native continuation token; `None` for offset-paginated
    /// upstreams (the caller increments the offset itself).
    pub next: Option<String>,
}
