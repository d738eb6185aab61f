//! Relay Queue Adapters
//!
//! Forwards normalized-order envelopes to the downstream relay service.
//! Delivery guarantees stop at "the batch was accepted"; retrying a
//! failed batch is the scheduler's business, and duplicate deliveries
//! are tolerated downstream.

pub mod http;

pub use http::HttpRelayQueue;
