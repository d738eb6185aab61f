//! LooksRare Order Feed
//!
//! Fetches ask orders from `/api/v1/orders`, newest first, with cursor
//! pagination. The upstream's continuation convention is the hash of
//! the page's last order; an empty page therefore carries no token.

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::MarketplaceClient;
use crate::domain::order::{OrderSource, Page, PagePosition, PageQuery, RawOrder};
use crate::ports::feed::OrderFeed;

/// LooksRare order as returned by the orders endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LooksRareOrder {
    pub hash: String,
    pub collection_address: String,
    pub signer: String,
    #[serde(with = "unix_seconds")]
    pub start_time: DateTime<Utc>,
    pub status: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

impl RawOrder for LooksRareOrder {
    fn hash(&self) -> &str {
        &self.hash
    }

    fn maker(&self) -> &str {
        &self.signer
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.start_time
    }

    fn fallback_target(&self) -> String {
        self.collection_address.clone()
    }

    fn stored_data(&self) -> Value {
        // Nothing oversized on this wire format; keep the full payload.
        serde_json::to_value(self).unwrap_or_default()
    }

    fn source(&self) -> OrderSource {
        OrderSource::LooksRare
    }
}

/// `startTime` arrives as unix seconds, as a number or a string
/// depending on the endpoint version.
mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SecondsRepr {
        Int(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(date.timestamp())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let secs = match SecondsRepr::deserialize(deserializer)? {
            SecondsRepr::Int(secs) => secs,
            SecondsRepr::Text(text) => text.parse::<i64>().map_err(serde::de::Error::custom)?,
        };
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
    }
}

/// Map the endpoint's response body to a page, deriving the
/// continuation token from the last order's hash.
fn page_from_body(body: Value) -> anyhow::Result<Page<LooksRareOrder>> {
    let orders = body
        .get("data")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let orders: Vec<LooksRareOrder> =
        serde_json::from_value(orders).context("malformed /api/v1/orders payload")?;

    let next = orders.last().map(|order| order.hash.clone());
    Ok(Page { orders, next })
}

/// Cursor-paginated order feed over the LooksRare REST API.
pub struct LooksRareFeed {
    client: MarketplaceClient,
}

impl LooksRareFeed {
    pub fn new(client: MarketplaceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OrderFeed for LooksRareFeed {
    type Raw = LooksRareOrder;

    async fn fetch_page(
        &self,
        position: &PagePosition,
        query: &PageQuery,
    ) -> anyhow::Result<Page<LooksRareOrder>> {
        let PagePosition::Cursor(cursor) = position else {
            bail!("looksrare feed is cursor-paginated");
        };

        let mut path = format!(
            "/api/v1/orders?isOrderAsk=true&status[]=VALID&sort=NEWEST&pagination[first]={}",
            query.limit
        );
        if let Some(cursor) = cursor {
            path.push_str(&format!("&pagination[cursor]={cursor}"));
        }
        if let Some(after) = query.listed_after {
            path.push_str(&format!("&startTime={}", after.timestamp()));
        }
        if let Some(before) = query.listed_before {
            path.push_str(&format!("&endTime={}", before.timestamp()));
        }

        let body = self
            .client
            .get_json(&path)
            .await
            .context("looksrare page fetch failed")?;

        page_from_body(body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_order(hash: &str) -> Value {
        json!({
            "hash": hash,
            "collectionAddress": "0xC0FFEE",
            "signer": "0xSIGNER",
            "startTime": 1_650_000_000,
            "endTime": 1_660_000_000,
            "status": "VALID",
            "isOrderAsk": true,
            "tokenId": "7",
            "price": "2500000000000000000",
            "signature": "0xsig"
        })
    }

    #[test]
    fn continuation_token_is_last_order_hash() {
        let page = page_from_body(json!({
            "success": true,
            "data": [sample_order("0xAAA"), sample_order("0xBBB")]
        }))
        .unwrap();

        assert_eq!(page.orders.len(), 2);
        assert_eq!(page.next.as_deref(), Some("0xBBB"));
    }

    #[test]
    fn empty_page_has_no_continuation_token() {
        let page = page_from_body(json!({ "success": true, "data": [] })).unwrap();
        assert!(page.orders.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn accessors_map_wire_fields() {
        let order: LooksRareOrder = serde_json::from_value(sample_order("0xAAA")).unwrap();
        assert_eq!(order.hash(), "0xAAA");
        assert_eq!(order.maker(), "0xSIGNER");
        assert_eq!(order.created_at().timestamp(), 1_650_000_000);
        assert_eq!(order.fallback_target(), "0xC0FFEE");
        assert_eq!(order.source(), OrderSource::LooksRare);
    }

    #[test]
    fn string_timestamps_deserialize_too() {
        let mut raw = sample_order("0xAAA");
        raw["startTime"] = json!("1650000123");
        let order: LooksRareOrder = serde_json::from_value(raw).unwrap();
        assert_eq!(order.created_at().timestamp(), 1_650_000_123);
    }

    #[test]
    fn stored_data_round_trips_the_full_payload() {
        let order: LooksRareOrder = serde_json::from_value(sample_order("0xAAA")).unwrap();
        let data = order.stored_data();
        assert_eq!(data["hash"], "0xAAA");
        assert_eq!(data["signature"], "0xsig");
        assert_eq!(data["tokenId"], "7");
        assert_eq!(data["startTime"], 1_650_000_000);
    }
}
