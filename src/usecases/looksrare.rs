//! LooksRare Sync - Cursor-Paginated Orchestrator
//!
//! Two entry points over the same page pipeline, both driven by the
//! upstream's continuation token rather than an offset:
//! - `sync_all`: drain newest-first until a page inserts nothing new,
//!   meaning the drain has caught up to already-seen history.
//! - `sync_window`: one page restricted to explicit time bounds; the
//!   next-page token goes back to the caller for externally-scheduled
//!   continuation.
//!
//! Unlike realtime OpenSea tailing, any failure here is fatal — there
//! is no partial-progress return value in cursor mode.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::order::{PagePosition, PageQuery};
use crate::ports::feed::OrderFeed;
use crate::ports::parser::OrderParser;
use crate::ports::relay::RelayQueue;
use crate::ports::store::OrderStore;
use crate::usecases::ingest::{self, PAGE_SIZE};

/// Cursor-mode sync orchestrator over the LooksRare order feed.
pub struct LooksRareSync<F, P, S, Q>
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

impl<F, P, S, Q> LooksRareSync<F, P, S, Q>
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

  /// Drain the feed newest-first until the store stops reporting new
  /// rows.
  ///
  /// A page whose entire batch collides with existing rows is the
  /// "caught up" signal, not an upstream-exhaustion signal; an empty
  /// page stops the drain the same way.
  pub async fn sync_all(&self) -> anyhow::Result<()> {
    let mut cursor: Option<String> = None;
    let query = PageQuery {
      limit: PAGE_SIZE,
      ..PageQuery::default()
    };

    loop {
      let position = PagePosition::Cursor(cursor.clone());
      let page = self.feed.fetch_page(&position, &query).await?;
      let next = page.next.clone();

      let outcome =
        ingest::process_page(page.orders, &self.parser, &self.store, &self.relay, None).await?;

      info!(
        fetched = outcome.fetched,
        inserted = outcome.inserted,
        relayed = outcome.relayed,
        "looksrare page processed"
      );

      if outcome.inserted == 0 {
        // Caught up to already-seen history.
        break;
      }

      // No continuation token means restarting from the newest page;
      // stop instead of spinning over the same orders.
      match next {
        Some(token) => cursor = Some(token),
        None => break,
      }
    }

    Ok(())
  }

  /// Fetch exactly one page restricted to the given time window and
  /// return the upstream's next-page token.
  ///
  /// No internal loop: the caller schedules any continuation itself,
  /// re-supplying the returned cursor.
  pub async fn sync_window(
    &self,
    listed_after: Option<DateTime<Utc>>,
    listed_before: Option<DateTime<Utc>>,
    cursor: Option<String>,
  ) -> anyhow::Result<Option<String>> {
    let position = PagePosition::Cursor(cursor);
    let query = PageQuery {
      limit: PAGE_SIZE,
      listed_after,
      listed_before,
    };

    let page = self.feed.fetch_page(&position, &query).await?;
    let next = page.next.clone();

    let outcome =
      ingest::process_page(page.orders, &self.parser, &self.store, &self.relay, None).await?;

    info!(
      fetched = outcome.fetched,
      inserted = outcome.inserted,
      relayed = outcome.relayed,
      next_cursor = ?next,
      "looksrare window page processed"
    );

    Ok(next)
  }
}
