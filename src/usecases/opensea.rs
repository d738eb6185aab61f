//! OpenSea Sync - Offset-Paginated Orchestrator
//!
//! Walks the Wyvern order feed newest-first with offset pagination,
//! handing each page to the shared pipeline. Mode policy:
//! - backfill: page until the upstream is exhausted; any failure is
//!   fatal and aborts the whole call.
//! - realtime: page until the cumulative ceiling is hit; a failure
//!   stops the loop and the progress gathered so far is returned, so
//!   the scheduler can resume from that point on its next invocation.
//! - once: exactly one page, no inter-page delay, rows not marked
//!   delayed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::domain::order::{PagePosition, PageQuery, RawOrder};
use crate::ports::feed::OrderFeed;
use crate::ports::parser::OrderParser;
use crate::ports::relay::RelayQueue;
use crate::ports::store::OrderStore;
use crate::usecases::ingest::{self, PAGE_SIZE};

/// Cumulative fetched-order ceiling for realtime sync. The scheduler is
/// expected to re-trigger on a cadence, so a realtime call never drains
/// arbitrarily deep history.
const REALTIME_MAX_ORDERS: usize = 1_000;

/// Pause between successive page fetches, respecting upstream rate
/// limits. Never applied after a one-shot page.
const PAGE_DELAY: Duration = Duration::from_secs(1);

/// Parameters for one offset-mode sync call.
#[derive(Debug, Clone)]
pub struct OpenSeaSyncOptions {
  /// Lower creation-time bound (exclusive), if any.
  pub listed_after: Option<DateTime<Utc>>,
  /// Upper creation-time bound (exclusive), if any.
  pub listed_before: Option<DateTime<Utc>>,
  /// Backfilling history rather than tailing live data.
  pub backfill: bool,
  /// Fetch exactly one page and return.
  pub once: bool,
  /// Starting offset into the result set.
  pub offset: u64,
  /// Page size.
  pub limit: usize,
}

impl Default for OpenSeaSyncOptions {
  fn default() -> Self {
    Self {
      listed_after: None,
      listed_before: None,
      backfill: false,
      once: false,
      offset: 0,
      limit: PAGE_SIZE,
    }
  }
}

/// Offset-mode sync orchestrator over the OpenSea Wyvern feed.
pub struct OpenSeaSync<F, P, S, Q>
where
  F: OrderFeed,
  P: OrderParser<F::Raw>,
  S: OrderStore,
  Q: RelayQueue,
{
  feed: F,
  parser: P,
  store: S,
  relay: Q,
}

impl<F, P, S, Q> OpenSeaSync<F, P, S, Q>
where
  F: OrderFeed,
  P: OrderParser<F::Raw>,
  S: OrderStore,
  Q: RelayQueue,
{
  pub fn new(feed: F, parser: P, store: S, relay: Q) -> Self {
    Self {
      feed,
      parser,
      store,
      relay,
    }
  }

  /// Run one sync call and return the last observed creation date.
  ///
  /// The return value is the caller's resumption token: a realtime
  /// scheduler seeds its next invocation's `listed_after` from it.
  /// `None` means no page was successfully observed.
  pub async fn sync(&self, opts: &OpenSeaSyncOptions) -> anyhow::Result<Option<DateTime<Utc>>> {
    let mut offset = opts.offset;
    let mut num_orders = 0usize;
    let mut last_created: Option<DateTime<Utc>> = None;

    let query = PageQuery {
      limit: opts.limit,
      listed_after: opts.listed_after,
      listed_before: opts.listed_before,
    };

    loop {
      let position = PagePosition::Offset(offset);
      // Rows from anything but a one-shot "live" fetch need downstream
      // reconciliation.
      let delayed = Some(!opts.once);

      let attempt = async {
        let page = self.feed.fetch_page(&position, &query).await?;
        // Newest-first sort: the page's last order is its oldest.
        let page_last = page.orders.last().map(|order| order.created_at());
        let outcome =
          ingest::process_page(page.orders, &self.parser, &self.store, &self.relay, delayed)
            .await?;
        anyhow::Ok((outcome, page_last))
      };

      let (outcome, page_last) = match attempt.await {
        Ok(result) => result,
        Err(e) => {
          if opts.backfill {
            return Err(e.context(format!("opensea backfill aborted at offset {offset}")));
          }
          // Realtime tailing absorbs the failure: stop here and hand the
          // caller whatever progress accumulated, so the next scheduled
          // invocation resumes from it.
          warn!(error = %e, offset, "realtime page failed, returning partial progress");
          break;
        }
      };

      num_orders += outcome.fetched;
      if let Some(created_at) = page_last {
        last_created = Some(created_at);
      }

      info!(
        offset,
        fetched = outcome.fetched,
        inserted = outcome.inserted,
        relayed = outcome.relayed,
        total = num_orders,
        "opensea page processed"
      );

      if opts.once {
        break;
      }
      if outcome.fetched < query.limit {
        // Upstream exhausted the window.
        break;
      }
      if !opts.backfill && num_orders >= REALTIME_MAX_ORDERS {
        info!(total = num_orders, "realtime ceiling reached, yielding to scheduler");
        break;
      }

      offset += query.limit as u64;
      sleep(PAGE_DELAY).await;
    }

    Ok(last_created)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_options_match_entry_point_defaults() {
    let opts = OpenSeaSyncOptions::default();
    assert_eq!(opts.offset, 0);
    assert_eq!(opts.limit, PAGE_SIZE);
    assert!(!opts.backfill);
    assert!(!opts.once);
    assert!(opts.listed_after.is_none());
    assert!(opts.listed_before.is_none());
  }
}
