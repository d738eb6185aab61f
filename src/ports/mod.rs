//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) the sync core requires from the
//! outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `OrderFeed`: one-page fetches from a marketplace API
//! - `OrderParser`: raw wire order -> normalized order, or nothing
//! - `OrderStore`: bulk insert with a unique-hash dedup contract
//! - `RelayQueue`: downstream envelope batches

pub mod feed;
pub mod parser;
pub mod relay;
pub mod store;
