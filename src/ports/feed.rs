//! Order Feed Port - Marketplace Page Fetching
//!
//! One implementation per marketplace. A feed owns its wire-order type
//! and its pagination convention; the orchestrators own the advancement
//! rule (offset increments vs server-issued cursors).

use async_trait::async_trait;

use crate::domain::order::{Page, PagePosition, PageQuery, RawOrder};

/// Trait for marketplace order feeds.
///
/// `fetch_page` returns one page of raw orders sorted newest-first by
/// creation time, plus the marketplace-native continuation token when
/// the upstream issues one. Implementors never loop — continuation is
/// the orchestrator's decision.
#[async_trait]
pub trait OrderFeed: Send + Sync {
  /// Marketplace wire-order type.
  type Raw: RawOrder + Send + 'static;

  /// Fetch one page at the given position, restricted to the query's
  /// time window when bounds are set.
  async fn fetch_page(
    &self,
    position: &PagePosition,
    query: &PageQuery,
  ) -> anyhow::Result<Page<Self::Raw>>;
}
