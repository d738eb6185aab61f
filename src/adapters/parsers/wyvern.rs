//! Wyvern Order Parser
//!
//! Normalizes OpenSea Wyvern sell orders. The canonical target is the
//! asset address from the protocol metadata — not the listing's display
//! asset, which only serves as the row fallback when parsing fails.

use async_trait::async_trait;
use serde_json::json;

use crate::adapters::api::opensea::WyvernOrder;
use crate::domain::order::{NormalizedOrder, OrderKind};
use crate::ports::parser::OrderParser;

pub struct WyvernParser;

#[async_trait]
impl OrderParser<WyvernOrder> for WyvernParser {
    async fn parse(&self, raw: &WyvernOrder) -> Option<NormalizedOrder> {
        // Sell-side orders only.
        let side = raw.rest.get("side")?.as_u64()?;
        if side != 1 {
            return None;
        }

        let target = raw
            .rest
            .get("metadata")?
            .get("asset")?
            .get("address")?
            .as_str()?;

        let exchange = raw.rest.get("exchange")?.as_str()?;
        let taker = raw.rest.get("taker")?.get("address")?.as_str()?;
        let payment_token = raw.rest.get("payment_token")?.as_str()?;
        let base_price = raw.rest.get("base_price")?.as_str()?;
        let calldata = raw.rest.get("calldata")?.as_str()?;
        let replacement_pattern = raw.rest.get("replacement_pattern")?.as_str()?;
        let listing_time = raw.rest.get("listing_time")?.as_i64()?;
        let expiration_time = raw.rest.get("expiration_time")?.as_i64()?;
        let salt = raw.rest.get("salt")?.as_str()?;
        let v = raw.rest.get("v")?.as_i64()?;
        let r = raw.rest.get("r")?.as_str()?;
        let s = raw.rest.get("s")?.as_str()?;

        let params = json!({
            "hash": raw.order_hash,
            "exchange": exchange,
            "maker": raw.maker.address,
            "taker": taker,
            "target": target,
            "paymentToken": payment_token,
            "basePrice": base_price,
            "calldata": calldata,
            "replacementPattern": replacement_pattern,
            "listingTime": listing_time,
            "expirationTime": expiration_time,
            "salt": salt,
            "v": v,
            "r": r,
            "s": s,
        });

        Some(NormalizedOrder {
            kind: OrderKind::WyvernV23,
            target: target.to_lowercase(),
            params,
        })
    }
}
