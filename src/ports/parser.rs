//! Order Parser Port - Wire Order Normalization
//!
//! The parser is a capability, not an object hierarchy: one trait, one
//! implementation per marketplace, selected by the caller.

use async_trait::async_trait;

use crate::domain::order::{NormalizedOrder, RawOrder};

/// Trait for marketplace-specific order parsers.
#[async_trait]
pub trait OrderParser<R: RawOrder>: Send + Sync {
  /// Convert a raw wire order into a normalized order, or `None` when
  /// it cannot be expressed as a supported protocol order.
  ///
  /// A `None` is an expected outcome, never an error: the order is
  /// still persisted with a fallback target, only its relay forwarding
  /// is skipped.
  async fn parse(&self, raw: &R) -> Option<NormalizedOrder>;
}
