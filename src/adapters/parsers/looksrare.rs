//! LooksRare Order Parser
//!
//! Normalizes LooksRare ask orders. Only signed, currently-valid asks
//! pass; everything else falls back to row-only persistence.

use async_trait::async_trait;
use serde_json::json;

use crate::adapters::api::looksrare::LooksRareOrder;
use crate::domain::order::{NormalizedOrder, OrderKind};
use crate::ports::parser::OrderParser;

pub struct LooksRareParser;

#[async_trait]
impl OrderParser<LooksRareOrder> for LooksRareParser {
    async fn parse(&self, raw: &LooksRareOrder) -> Option<NormalizedOrder> {
        if raw.status != "VALID" {
            return None;
        }
        if !raw.rest.get("isOrderAsk")?.as_bool()? {
            return None;
        }

        let token_id = raw.rest.get("tokenId")?.as_str()?;
        let price = raw.rest.get("price")?.as_str()?;
        let amount = raw.rest.get("amount")?.as_str()?;
        let strategy = raw.rest.get("strategy")?.as_str()?;
        let currency = raw.rest.get("currencyAddress")?.as_str()?;
        let nonce = raw.rest.get("nonce")?.as_str()?;
        let end_time = raw.rest.get("endTime")?.as_i64()?;
        let min_percentage_to_ask = raw.rest.get("minPercentageToAsk")?.as_i64()?;
        let signature = raw.rest.get("signature")?.as_str()?;

        let params = json!({
            "hash": raw.hash,
            "collection": raw.collection_address,
            "tokenId": token_id,
            "signer": raw.signer,
            "strategy": strategy,
            "currency": currency,
            "price": price,
            "amount": amount,
            "nonce": nonce,
            "startTime": raw.start_time.timestamp(),
            "endTime": end_time,
            "minPercentageToAsk": min_percentage_to_ask,
            "signature": signature,
        });

        Some(NormalizedOrder {
            kind: OrderKind::LooksRare,
            target: raw.collection_address.to_lowercase(),
            params,
        })
    }
}
