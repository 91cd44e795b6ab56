use crate::clients::StockLedger;
use crate::model::{OrderItem, Sku, Stock};
use crate::stock_actor::entity::aggregate;
use crate::stock_actor::StockError;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use tracing::{debug, instrument};

pub(crate) fn storage(e: sqlx::Error) -> StockError {
    StockError::Storage(e.to_string())
}

/// The invariant lives in each statement's `WHERE`, so a row that would break
/// it is simply not updated.
#[derive(Debug, Clone, Copy)]
enum BatchOp {
    Reserve,
    RemoveReserved,
    CancelReserved,
}

impl BatchOp {
    const fn sql(self) -> &'static str {
        match self {
            BatchOp::Reserve => {
                "UPDATE stocks SET reserved = reserved + $2
                 WHERE sku = $1 AND reserved + $2 <= total_count"
            }
            BatchOp::RemoveReserved => {
                "UPDATE stocks SET reserved = reserved - $2, total_count = total_count - $2
                 WHERE sku = $1 AND reserved >= $2"
            }
            BatchOp::CancelReserved => {
                "UPDATE stocks SET reserved = reserved - $2
                 WHERE sku = $1 AND reserved >= $2"
            }
        }
    }
}

#[derive(Clone)]
pub struct PgStockLedger {
    pool: PgPool,
}

impl PgStockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn apply(&self, op: BatchOp, items: &[OrderItem]) -> Result<(), StockError> {
        // Lock rows in SKU order so overlapping batches can't deadlock.
        let mut batch = aggregate(items);
        batch.sort_by_key(|(sku, _)| *sku);

        let mut tx = self.pool.begin().await.map_err(storage)?;
        for (sku, change) in batch {
            let change_param = i64::try_from(change).map_err(|_| StockError::OutOfBounds {
                sku,
                reserved: 0,
                total_count: 0,
                change,
            })?;
            let updated = sqlx::query(op.sql())
                .bind(sku)
                .bind(change_param)
                .execute(&mut *tx)
                .await
                .map_err(storage)?
                .rows_affected();
            if updated == 0 {
                // Dropping `tx` rolls back the lines already applied.
                return Err(diagnose(&mut tx, sku, change).await);
            }
        }
        tx.commit().await.map_err(storage)?;
        debug!(?op, "Stock batch committed");
        Ok(())
    }

    async fn fetch(&self, sku: Sku) -> Result<Stock, StockError> {
        let row = sqlx::query("SELECT sku, total_count, reserved FROM stocks WHERE sku = $1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or(StockError::NotFound { sku })?;
        stock_from_row(&row)
    }
}

/// Rebuilds the typed error for a line whose conditional update matched nothing.
async fn diagnose(conn: &mut PgConnection, sku: Sku, change: u64) -> StockError {
    let row = sqlx::query("SELECT sku, total_count, reserved FROM stocks WHERE sku = $1")
        .bind(sku)
        .fetch_optional(&mut *conn)
        .await;
    match row {
        Ok(None) => StockError::NotFound { sku },
        Ok(Some(row)) => match stock_from_row(&row) {
            Ok(stock) => StockError::OutOfBounds {
                sku,
                reserved: stock.reserved,
                total_count: stock.total_count,
                change,
            },
            Err(e) => e,
        },
        Err(e) => storage(e),
    }
}

fn stock_from_row(row: &PgRow) -> Result<Stock, StockError> {
    let counter = |column: &str| -> Result<u32, StockError> {
        let value: i64 = row.try_get(column).map_err(storage)?;
        u32::try_from(value)
            .map_err(|_| StockError::Storage(format!("{column} out of range: {value}")))
    };
    Ok(Stock {
        sku: row.try_get("sku").map_err(storage)?,
        total_count: counter("total_count")?,
        reserved: counter("reserved")?,
    })
}

#[async_trait]
impl StockLedger for PgStockLedger {
    async fn reserve(&self, items: &[OrderItem]) -> Result<(), StockError> {
        self.apply(BatchOp::Reserve, items).await
    }

    async fn remove_reserved(&self, items: &[OrderItem]) -> Result<(), StockError> {
        self.apply(BatchOp::RemoveReserved, items).await
    }

    async fn cancel_reserved(&self, items: &[OrderItem]) -> Result<(), StockError> {
        self.apply(BatchOp::CancelReserved, items).await
    }

    async fn available(&self, sku: Sku) -> Result<u32, StockError> {
        self.fetch(sku).await.map(|stock| stock.available())
    }

    async fn stock(&self, sku: Sku) -> Result<Stock, StockError> {
        self.fetch(sku).await
    }
}
