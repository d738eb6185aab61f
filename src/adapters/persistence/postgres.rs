//! Postgres Order Store
//!
//! Pooled sqlx connection with startup migrations. `bulk_insert` is a
//! single multi-row statement ending in
//! `ON CONFLICT (hash) DO NOTHING RETURNING hash`, so the returned
//! hashes are exactly the rows that were newly written — the signal the
//! orchestrators' stopping rules consume.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, QueryBuilder};
use tracing::info;

use crate::domain::order::OrderRow;
use crate::ports::store::OrderStore;

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool and apply pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await
            .context("failed to connect to the order store")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("order store migration failed")?;

        info!(max_connections, "order store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn bulk_insert(&self, rows: &[OrderRow]) -> anyhow::Result<Vec<String>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::new(
            "INSERT INTO orders (hash, target, maker, created_at, data, delayed, source) ",
        );
        query.push_values(rows, |mut b, row| {
            b.push_bind(&row.hash)
                .push_bind(&row.target)
                .push_bind(&row.maker)
                .push_bind(row.created_at)
                .push_bind(&row.data)
                .push_bind(row.delayed)
                .push_bind(row.source.as_str());
        });
        query.push(" ON CONFLICT (hash) DO NOTHING RETURNING hash");

        let inserted: Vec<String> = query
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .context("order bulk insert failed")?;

        Ok(inserted)
    }
}
