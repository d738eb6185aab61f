//! OpenSea Wyvern Order Feed
//!
//! Fetches sell-side Wyvern orders from `/wyvern/v1/orders`, newest
//! first, with offset pagination. The API attaches full asset metadata
//! to every order; those blobs are stripped before a row's `data` is
//! persisted (the contract address survives as the fallback target).

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::MarketplaceClient;
use crate::domain::order::{
    NULL_ADDRESS, OrderSource, Page, PagePosition, PageQuery, RawOrder,
};
use crate::ports::feed::OrderFeed;

/// Wyvern order as returned by the orders endpoint.
///
/// Only the fields the sync engine reads are typed; everything else is
/// carried verbatim in `rest` so the stored payload stays faithful to
/// the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WyvernOrder {
    pub order_hash: String,
    #[serde(with = "created_date_format")]
    pub created_date: DateTime<Utc>,
    pub maker: WyvernAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<WyvernAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_bundle: Option<WyvernAssetBundle>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WyvernAccount {
    pub address: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WyvernAsset {
    pub asset_contract: WyvernAssetContract,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WyvernAssetContract {
    pub address: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WyvernAssetBundle {
    #[serde(default)]
    pub assets: Vec<WyvernAsset>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

impl RawOrder for WyvernOrder {
    fn hash(&self) -> &str {
        &self.order_hash
    }

    fn maker(&self) -> &str {
        &self.maker.address
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_date
    }

    fn fallback_target(&self) -> String {
        if let Some(asset) = &self.asset {
            return asset.asset_contract.address.clone();
        }
        if let Some(bundle) = &self.asset_bundle {
            if let Some(first) = bundle.assets.first() {
                return first.asset_contract.address.clone();
            }
        }
        NULL_ADDRESS.to_string()
    }

    fn stored_data(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Value::Object(map) = &mut value {
            // Asset metadata dwarfs the order itself.
            map.remove("asset");
            map.remove("asset_bundle");
        }
        value
    }

    fn source(&self) -> OrderSource {
        OrderSource::OpenSea
    }
}

/// `created_date` arrives as a naive UTC string with fractional
/// seconds and no zone suffix (`2022-01-05T12:34:56.123456`).
mod created_date_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        if let Ok(naive) = NaiveDateTime::parse_from_str(&s, FORMAT) {
            return Ok(naive.and_utc());
        }
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Map the endpoint's response body to a page. Offset pagination means
/// the upstream issues no continuation token.
fn page_from_body(body: Value) -> anyhow::Result<Page<WyvernOrder>> {
    let orders = body
        .get("orders")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let orders: Vec<WyvernOrder> =
        serde_json::from_value(orders).context("malformed /wyvern/v1/orders payload")?;

    Ok(Page { orders, next: None })
}

/// Offset-paginated order feed over the OpenSea REST API.
pub struct OpenSeaFeed {
    client: MarketplaceClient,
}

impl OpenSeaFeed {
    pub fn new(client: MarketplaceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OrderFeed for OpenSeaFeed {
    type Raw = WyvernOrder;

    async fn fetch_page(
        &self,
        position: &PagePosition,
        query: &PageQuery,
    ) -> anyhow::Result<Page<WyvernOrder>> {
        let PagePosition::Offset(offset) = position else {
            bail!("opensea feed is offset-paginated");
        };

        let mut path = format!(
            "/wyvern/v1/orders?bundled=false&side=1&sale_kind=0&is_english=false\
             &order_by=created_date&order_direction=desc&limit={}&offset={}",
            query.limit, offset
        );
        if let Some(after) = query.listed_after {
            path.push_str(&format!("&listed_after={}", after.timestamp()));
        }
        if let Some(before) = query.listed_before {
            path.push_str(&format!("&listed_before={}", before.timestamp()));
        }

        let body = self
            .client
            .get_json(&path)
            .await
            .context("opensea page fetch failed")?;

        page_from_body(body)
    }
}
