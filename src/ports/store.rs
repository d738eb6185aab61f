//! Order Store Port - Persistence Contract
//!
//! Only the insert contract matters to the sync core: the store's
//! schema, indexing, and connection management live in the adapter.

use async_trait::async_trait;

use crate::domain::order::OrderRow;

/// Trait for the order sink.
#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Insert rows, silently skipping any whose `hash` already exists.
  ///
  /// Returns the hashes of the rows actually written. The newly-inserted
  /// count drives the orchestrators' stopping decisions, so an adapter
  /// must not report skipped conflicts as inserted.
  async fn bulk_insert(&self, rows: &[OrderRow]) -> anyhow::Result<Vec<String>>;
}
