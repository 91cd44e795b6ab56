//! Postgres-backed ledgers and outbox.
//!
//! Same seams as the in-memory actors. Atomicity comes from one transaction
//! per operation instead of one actor per store.

mod order;
mod outbox;
mod stock;

pub use order::PgOrderLedger;
pub use outbox::PgOutboxStore;
pub use stock::PgStockLedger;

use crate::model::Stock;
use crate::stock_actor::entity::check_seed;
use crate::stock_actor::StockError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const SCHEMA: &str = include_str!("schema.sql");

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Creates the tables if they don't exist yet.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Inserts seed records, leaving SKUs that already exist untouched.
///
/// The seed itself is checked the same way the in-memory ledger checks it.
pub async fn seed_stocks(pool: &PgPool, stocks: &[Stock]) -> Result<u64, StockError> {
    check_seed(stocks)?;
    let mut tx = pool.begin().await.map_err(stock::storage)?;
    let mut inserted = 0;
    for stock in stocks {
        inserted += sqlx::query(
            "INSERT INTO stocks (sku, total_count, reserved) VALUES ($1, $2, $3)
             ON CONFLICT (sku) DO NOTHING",
        )
        .bind(stock.sku)
        .bind(i64::from(stock.total_count))
        .bind(i64::from(stock.reserved))
        .execute(&mut *tx)
        .await
        .map_err(stock::storage)?
        .rows_affected();
    }
    tx.commit().await.map_err(stock::storage)?;
    info!(inserted, total = stocks.len(), "Seeded stocks");
    Ok(inserted)
}
