//! Marketplace API Adapters
//!
//! One feed per marketplace over a shared HTTP client. Each feed owns
//! its wire-order types, its query-parameter shape, and its pagination
//! convention; everything past the page boundary is the sync core's
//! business.
//!
//! Sub-modules:
//! - `client`: HTTP client with timeout, API-key header, bounded retry
//! - `opensea`: Wyvern order feed (offset-paginated)
//! - `looksrare`: LooksRare order feed (cursor-paginated)

pub mod client;
pub mod looksrare;
pub mod opensea;
