//! Page Pipeline - Shared Per-Page Processing
//!
//! Both marketplace orchestrators hand each fetched page to
//! [`process_page`]: raw orders are parsed with bounded concurrency,
//! every order becomes a store row regardless of parse outcome, parsed
//! orders are batched to the relay queue, and the page's rows go to the
//! store in one bulk insert. The newly-inserted count flows back to the
//! orchestrator, which uses it for its stopping decision.

use anyhow::Context;
use futures_util::stream::{self, StreamExt};
use tracing::debug;

use crate::domain::order::{build_row, OrderEnvelope, OrderRow, RawOrder};
use crate::ports::parser::OrderParser;
use crate::ports::relay::RelayQueue;
use crate::ports::store::OrderStore;

/// Page size requested from both marketplaces.
pub const PAGE_SIZE: usize = 50;

/// Maximum in-flight parse operations per page. Protects the parser
/// dependency, not shared state — accumulation is append-only and
/// completion order is free to differ from input order.
pub const PARSE_CONCURRENCY: usize = 20;

/// What one processed page looked like.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOutcome {
  /// Raw orders the upstream returned.
  pub fetched: usize,
  /// Rows the store reported as newly inserted.
  pub inserted: usize,
  /// Envelopes forwarded to the relay queue.
  pub relayed: usize,
}

/// Parse, persist, and relay one page of raw orders.
///
/// `delayed` is threaded into every row (OpenSea sets `Some(!once)`,
/// LooksRare passes `None`) and, flattened, onto the relay batch.
/// Store and relay calls are skipped entirely for empty batches.
pub async fn process_page<R, P, S, Q>(
  orders: Vec<R>,
  parser: &P,
  store: &S,
  relay: &Q,
  delayed: Option<bool>,
) -> anyhow::Result<PageOutcome>
where
  R: RawOrder,
  P: OrderParser<R>,
  S: OrderStore,
  Q: RelayQueue,
{
  let fetched = orders.len();

  let processed: Vec<(OrderRow, Option<OrderEnvelope>)> = stream::iter(orders)
    .map(|raw| async move {
      let parsed = parser.parse(&raw).await;
      if parsed.is_none() {
        debug!(hash = %raw.hash(), source = %raw.source(), "order not parseable, storing with fallback target");
      }
      let row = build_row(&raw, parsed.as_ref(), delayed);
      (row, parsed.map(OrderEnvelope::from))
    })
    .buffer_unordered(PARSE_CONCURRENCY)
    .collect()
    .await;

  let mut rows = Vec::with_capacity(processed.len());
  let mut envelopes = Vec::new();
  for (row, envelope) in processed {
    rows.push(row);
    if let Some(envelope) = envelope {
      envelopes.push(envelope);
    }
  }

  if !envelopes.is_empty() {
    relay
      .enqueue(&envelopes, delayed.unwrap_or(false))
      .await
      .context("relay enqueue failed")?;
  }

  let inserted = if rows.is_empty() {
    Vec::new()
  } else {
    store
      .bulk_insert(&rows)
      .await
      .context("order bulk insert failed")?
  };

  Ok(PageOutcome {
    fetched,
    inserted: inserted.len(),
    relayed: envelopes.len(),
  })
}
