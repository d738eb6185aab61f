//! Integration Tests - Sync Engine Behavior
//!
//! Drives both orchestrators against a mocked feed and in-memory
//! store/relay fakes: stopping rules, the realtime ceiling, the
//! failure-policy asymmetry between modes, one-shot fetches, and the
//! dedup contract.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use serde_json::json;

use marketplace_sync::domain::order::{
    NormalizedOrder, OrderEnvelope, OrderKind, OrderRow, OrderSource, Page, PagePosition,
    PageQuery, RawOrder,
};
use marketplace_sync::ports::feed::OrderFeed;
use marketplace_sync::ports::parser::OrderParser;
use marketplace_sync::ports::relay::RelayQueue;
use marketplace_sync::ports::store::OrderStore;
use marketplace_sync::usecases::looksrare::LooksRareSync;
use marketplace_sync::usecases::opensea::{OpenSeaSync, OpenSeaSyncOptions};

// ---- Test Order ----

#[derive(Debug, Clone)]
pub struct TestOrder {
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

impl RawOrder for TestOrder {
    fn hash(&self) -> &str {
        &self.hash
    }

    fn maker(&self) -> &str {
        "0xMAKER"
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn fallback_target(&self) -> String {
        "0xFALLBACK".to_string()
    }

    fn stored_data(&self) -> serde_json::Value {
        json!({ "hash": self.hash })
    }

    fn source(&self) -> OrderSource {
        OrderSource::OpenSea
    }
}

// ---- Mock Feed ----

mock! {
    pub Feed {}

    #[async_trait]
    impl OrderFeed for Feed {
        type Raw = TestOrder;

        async fn fetch_page(
            &self,
            position: &PagePosition,
            query: &PageQuery,
        ) -> anyhow::Result<Page<TestOrder>>;
    }
}

// ---- In-memory fakes ----

#[derive(Clone, Default)]
struct AcceptAllParser;

#[async_trait]
impl OrderParser<TestOrder> for AcceptAllParser {
    async fn parse(&self, raw: &TestOrder) -> Option<NormalizedOrder> {
        Some(NormalizedOrder {
            kind: OrderKind::WyvernV23,
            target: "0xTARGET".to_string(),
            params: json!({ "hash": raw.hash }),
        })
    }
}

#[derive(Clone, Default)]
struct RejectAllParser;

#[async_trait]
impl OrderParser<TestOrder> for RejectAllParser {
    async fn parse(&self, _raw: &TestOrder) -> Option<NormalizedOrder> {
        None
    }
}

/// Store fake honoring the unique-hash contract: only never-seen hashes
/// count as inserted, duplicates are silent no-ops.
#[derive(Clone, Default)]
struct MemoryStore {
    rows: Arc<Mutex<Vec<OrderRow>>>,
    seen: Arc<Mutex<HashSet<String>>>,
}

impl MemoryStore {
    fn preloaded(hashes: impl IntoIterator<Item = String>) -> Self {
        let store = Self::default();
        store.seen.lock().unwrap().extend(hashes);
        store
    }

    fn inserted_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn rows(&self) -> Vec<OrderRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn bulk_insert(&self, rows: &[OrderRow]) -> anyhow::Result<Vec<String>> {
        let mut seen = self.seen.lock().unwrap();
        let mut stored = self.rows.lock().unwrap();
        let mut inserted = Vec::new();
        for row in rows {
            if seen.insert(row.hash.clone()) {
                stored.push(row.clone());
                inserted.push(row.hash.clone());
            }
        }
        Ok(inserted)
    }
}

#[derive(Clone, Default)]
struct MemoryRelay {
    batches: Arc<Mutex<Vec<(usize, bool)>>>,
}

impl MemoryRelay {
    fn batches(&self) -> Vec<(usize, bool)> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayQueue for MemoryRelay {
    async fn enqueue(&self, orders: &[OrderEnvelope], delayed: bool) -> anyhow::Result<()> {
        self.batches.lock().unwrap().push((orders.len(), delayed));
        Ok(())
    }
}

// ---- Page scripting helpers ----

const BASE_TS: i64 = 1_650_000_000;

/// The n-th order of the upstream result set, newest first: creation
/// timestamps strictly decrease as the index grows.
fn order(n: u64) -> TestOrder {
    TestOrder {
        hash: format!("0xORDER{n:04}"),
        created_at: DateTime::from_timestamp(BASE_TS - n as i64, 0).unwrap(),
    }
}

fn created_at_of(n: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(BASE_TS - n as i64, 0).unwrap()
}

/// A page of `count` orders starting at result-set index `start`.
fn page_of(start: u64, count: usize) -> Page<TestOrder> {
    Page {
        orders: (0..count as u64).map(|i| order(start + i)).collect(),
        next: None,
    }
}

fn lowercase_hashes(page: &Page<TestOrder>) -> Vec<String> {
    page.orders.iter().map(|o| o.hash.to_lowercase()).collect()
}

/// Feed that serves the scripted pages in order and panics on any
/// extra fetch, also recording every requested position.
fn scripted_feed(
    pages: Vec<anyhow::Result<Page<TestOrder>>>,
    positions: Arc<Mutex<Vec<PagePosition>>>,
) -> MockFeed {
    let pages = Arc::new(Mutex::new(pages));
    let mut feed = MockFeed::new();
    feed.expect_fetch_page().returning(move |position, _query| {
        positions.lock().unwrap().push(position.clone());
        let mut pages = pages.lock().unwrap();
        assert!(!pages.is_empty(), "unexpected extra page fetch");
        pages.remove(0)
    });
    feed
}

// ---- Offset mode (OpenSea) ----

#[tokio::test]
async fn realtime_stops_after_short_page() {
    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(vec![Ok(page_of(0, 49))], Arc::clone(&positions));
    let store = MemoryStore::default();
    let relay = MemoryRelay::default();
    let sync = OpenSeaSync::new(feed, AcceptAllParser, store.clone(), relay.clone());

    let progress = sync.sync(&OpenSeaSyncOptions::default()).await.unwrap();

    assert_eq!(progress, Some(created_at_of(48)));
    assert_eq!(*positions.lock().unwrap(), vec![PagePosition::Offset(0)]);
    assert_eq!(store.inserted_count(), 49);
    // Realtime rows are marked delayed and the relay batch carries the flag.
    assert!(store.rows().iter().all(|row| row.delayed == Some(true)));
    assert_eq!(relay.batches(), vec![(49, true)]);
}

#[tokio::test(start_paused = true)]
async fn backfill_advances_offset_until_exhaustion() {
    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(
        vec![Ok(page_of(0, 50)), Ok(page_of(50, 50)), Ok(page_of(100, 20))],
        Arc::clone(&positions),
    );
    let store = MemoryStore::default();
    let sync = OpenSeaSync::new(feed, AcceptAllParser, store.clone(), MemoryRelay::default());

    let opts = OpenSeaSyncOptions {
        backfill: true,
        ..OpenSeaSyncOptions::default()
    };
    let progress = sync.sync(&opts).await.unwrap();

    assert_eq!(
        *positions.lock().unwrap(),
        vec![
            PagePosition::Offset(0),
            PagePosition::Offset(50),
            PagePosition::Offset(100),
        ]
    );
    assert_eq!(progress, Some(created_at_of(119)));
    assert_eq!(store.inserted_count(), 120);
}

#[tokio::test]
async fn once_fetches_exactly_one_page_even_when_full() {
    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(vec![Ok(page_of(0, 50))], Arc::clone(&positions));
    let store = MemoryStore::default();
    let relay = MemoryRelay::default();
    let sync = OpenSeaSync::new(feed, AcceptAllParser, store.clone(), relay.clone());

    let opts = OpenSeaSyncOptions {
        once: true,
        ..OpenSeaSyncOptions::default()
    };
    let progress = sync.sync(&opts).await.unwrap();

    assert_eq!(progress, Some(created_at_of(49)));
    assert_eq!(positions.lock().unwrap().len(), 1);
    // One-shot "live" rows are not marked for later reconciliation.
    assert!(store.rows().iter().all(|row| row.delayed == Some(false)));
    assert_eq!(relay.batches(), vec![(50, false)]);
}

#[tokio::test(start_paused = true)]
async fn realtime_ceiling_stops_despite_full_pages() {
    let positions = Arc::new(Mutex::new(Vec::new()));
    let pages: Vec<anyhow::Result<Page<TestOrder>>> =
        (0..25u64).map(|p| Ok(page_of(p * 50, 50))).collect();
    let feed = scripted_feed(pages, Arc::clone(&positions));
    let store = MemoryStore::default();
    let sync = OpenSeaSync::new(feed, AcceptAllParser, store.clone(), MemoryRelay::default());

    let progress = sync.sync(&OpenSeaSyncOptions::default()).await.unwrap();

    // 20 pages x 50 orders reach the 1000-order ceiling.
    assert_eq!(positions.lock().unwrap().len(), 20);
    assert_eq!(store.inserted_count(), 1000);
    assert_eq!(progress, Some(created_at_of(999)));
}

#[tokio::test(start_paused = true)]
async fn backfill_page_failure_is_fatal() {
    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(
        vec![Ok(page_of(0, 50)), Err(anyhow::anyhow!("upstream 502"))],
        Arc::clone(&positions),
    );
    let store = MemoryStore::default();
    let sync = OpenSeaSync::new(feed, AcceptAllParser, store.clone(), MemoryRelay::default());

    let opts = OpenSeaSyncOptions {
        backfill: true,
        ..OpenSeaSyncOptions::default()
    };
    let result = sync.sync(&opts).await;

    assert!(result.is_err());
    // Page 1 still landed before the abort.
    assert_eq!(store.inserted_count(), 50);
}

#[tokio::test(start_paused = true)]
async fn realtime_page_failure_returns_partial_progress() {
    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(
        vec![Ok(page_of(0, 50)), Err(anyhow::anyhow!("upstream 502"))],
        Arc::clone(&positions),
    );
    let store = MemoryStore::default();
    let sync = OpenSeaSync::new(feed, AcceptAllParser, store.clone(), MemoryRelay::default());

    let progress = sync.sync(&OpenSeaSyncOptions::default()).await.unwrap();

    // No error raised; the caller gets page 1's last creation date to
    // resume from on its next scheduled invocation.
    assert_eq!(progress, Some(created_at_of(49)));
    assert_eq!(positions.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn rerun_with_same_window_inserts_nothing_new() {
    let store = MemoryStore::default();

    for expected_new in [49usize, 0] {
        let positions = Arc::new(Mutex::new(Vec::new()));
        let feed = scripted_feed(vec![Ok(page_of(0, 49))], Arc::clone(&positions));
        let sync = OpenSeaSync::new(feed, AcceptAllParser, store.clone(), MemoryRelay::default());

        let before = store.inserted_count();
        let progress = sync.sync(&OpenSeaSyncOptions::default()).await.unwrap();

        assert_eq!(progress, Some(created_at_of(48)));
        assert_eq!(store.inserted_count() - before, expected_new);
    }

    assert_eq!(store.inserted_count(), 49);
}

#[tokio::test]
async fn unparseable_orders_get_fallback_rows_and_no_relay() {
    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(vec![Ok(page_of(0, 10))], Arc::clone(&positions));
    let store = MemoryStore::default();
    let relay = MemoryRelay::default();
    let sync = OpenSeaSync::new(feed, RejectAllParser, store.clone(), relay.clone());

    sync.sync(&OpenSeaSyncOptions::default()).await.unwrap();

    assert_eq!(store.inserted_count(), 10);
    assert!(store
        .rows()
        .iter()
        .all(|row| row.target == "0xfallback" && row.maker == "0xmaker"));
    assert!(relay.batches().is_empty());
}

// ---- Cursor mode (LooksRare) ----

#[tokio::test]
async fn drain_stops_when_a_page_inserts_nothing_new() {
    let page_a = Page {
        next: Some("cursor-a".to_string()),
        ..page_of(0, 50)
    };
    let page_b = Page {
        next: Some("cursor-b".to_string()),
        ..page_of(50, 50)
    };
    // Every hash of page B is already in the store.
    let store = MemoryStore::preloaded(lowercase_hashes(&page_b));

    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(vec![Ok(page_a), Ok(page_b)], Arc::clone(&positions));
    let sync = LooksRareSync::new(feed, AcceptAllParser, store.clone(), MemoryRelay::default());

    sync.sync_all().await.unwrap();

    assert_eq!(
        *positions.lock().unwrap(),
        vec![
            PagePosition::Cursor(None),
            PagePosition::Cursor(Some("cursor-a".to_string())),
        ]
    );
    // Only page A produced new rows, and none are marked delayed.
    assert_eq!(store.inserted_count(), 50);
    assert!(store.rows().iter().all(|row| row.delayed.is_none()));
}

#[tokio::test]
async fn drain_terminates_immediately_when_fully_caught_up() {
    let page = Page {
        next: Some("cursor-a".to_string()),
        ..page_of(0, 50)
    };
    let store = MemoryStore::preloaded(lowercase_hashes(&page));

    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(vec![Ok(page)], Arc::clone(&positions));
    let sync = LooksRareSync::new(feed, AcceptAllParser, store.clone(), MemoryRelay::default());

    sync.sync_all().await.unwrap();

    assert_eq!(positions.lock().unwrap().len(), 1);
    assert_eq!(store.inserted_count(), 0);
}

#[tokio::test]
async fn drain_stops_when_upstream_withholds_continuation_token() {
    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(vec![Ok(page_of(0, 50))], Arc::clone(&positions));
    let store = MemoryStore::default();
    let sync = LooksRareSync::new(feed, AcceptAllParser, store.clone(), MemoryRelay::default());

    sync.sync_all().await.unwrap();

    assert_eq!(positions.lock().unwrap().len(), 1);
    assert_eq!(store.inserted_count(), 50);
}

#[tokio::test]
async fn drain_page_failure_is_fatal() {
    let page_a = Page {
        next: Some("cursor-a".to_string()),
        ..page_of(0, 50)
    };
    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(
        vec![Ok(page_a), Err(anyhow::anyhow!("upstream timeout"))],
        Arc::clone(&positions),
    );
    let sync = LooksRareSync::new(
        feed,
        AcceptAllParser,
        MemoryStore::default(),
        MemoryRelay::default(),
    );

    assert!(sync.sync_all().await.is_err());
}

#[tokio::test]
async fn window_fetch_returns_next_cursor_without_looping() {
    let page = Page {
        next: Some("next-token".to_string()),
        ..page_of(0, 50)
    };
    let positions = Arc::new(Mutex::new(Vec::new()));
    let feed = scripted_feed(vec![Ok(page)], Arc::clone(&positions));
    let store = MemoryStore::default();
    let sync = LooksRareSync::new(feed, AcceptAllParser, store.clone(), MemoryRelay::default());

    let after = DateTime::from_timestamp(BASE_TS - 1000, 0);
    let before = DateTime::from_timestamp(BASE_TS, 0);
    let next = sync
        .sync_window(after, before, Some("start-token".to_string()))
        .await
        .unwrap();

    // One page fetched from the supplied cursor, full size or not.
    assert_eq!(next.as_deref(), Some("next-token"));
    assert_eq!(
        *positions.lock().unwrap(),
        vec![PagePosition::Cursor(Some("start-token".to_string()))]
    );
    assert_eq!(store.inserted_count(), 50);
}
