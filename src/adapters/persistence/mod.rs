//! Persistence Adapters - Postgres Order Store
//!
//! Implements the `OrderStore` port against Postgres. The dedup
//! contract lives in the schema: `hash` is the primary key, and the
//! bulk insert reports only the rows that survived the conflict check.

pub mod postgres;

pub use postgres::PgOrderStore;
