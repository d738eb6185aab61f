//! Order Parser Adapters
//!
//! One `OrderParser` implementation per marketplace. A parser either
//! produces a normalized order ready for downstream fulfillment or
//! rejects the input with `None` — rejection is an expected outcome,
//! handled by the pipeline's fallback row, never an error.

pub mod looksrare;
pub mod wyvern;
