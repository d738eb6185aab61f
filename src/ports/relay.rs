//! Relay Queue Port - Downstream Forwarding
//!
//! Transport and delivery guarantees belong to the adapter; the core
//! only needs batched enqueueing. Exactly-once delivery is a non-goal.

use async_trait::async_trait;

use crate::domain::order::OrderEnvelope;

/// Trait for the downstream processing queue.
#[async_trait]
pub trait RelayQueue: Send + Sync {
  /// Push a batch of normalized-order envelopes downstream.
  ///
  /// `delayed` marks batches whose rows still need asynchronous
  /// reconciliation (every OpenSea fetch that is not one-shot).
  async fn enqueue(&self, orders: &[OrderEnvelope], delayed: bool) -> anyhow::Result<()>;
}
