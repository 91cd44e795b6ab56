use crate::clients::{BatchOutcome, OutboxError, OutboxSink, OutboxStore};
use crate::model::{OutboxEntry, OutboxStatus};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument, warn};

fn storage(e: sqlx::Error) -> OutboxError {
    OutboxError::Storage(e.to_string())
}

fn entry_from_row(row: &PgRow) -> Result<OutboxEntry, OutboxError> {
    let status: String = row.try_get("status").map_err(storage)?;
    Ok(OutboxEntry {
        id: row.try_get("id").map_err(storage)?,
        topic: row.try_get("topic").map_err(storage)?,
        key: row.try_get("key").map_err(storage)?,
        payload: row.try_get("payload").map_err(storage)?,
        status: status.parse().map_err(OutboxError::Storage)?,
    })
}

/// Outbox drained with `FOR UPDATE SKIP LOCKED`.
///
/// The claim, the delivery and the status flip share one transaction, so
/// concurrent publishers never see the same row and a crash mid-batch leaves
/// the rows `pending`.
#[derive(Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    #[instrument(skip(self, sink))]
    async fn process_pending(
        &self,
        batch_size: usize,
        sink: &dyn OutboxSink,
    ) -> Result<BatchOutcome, OutboxError> {
        let limit = i64::try_from(batch_size).unwrap_or(i64::MAX);
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let batch = sqlx::query(
            "SELECT id, topic, key, payload, status FROM outbox
             WHERE status = 'pending'
             ORDER BY id
             LIMIT $1
             FOR UPDATE SKIP LOCKED",
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(storage)?
        .iter()
        .map(entry_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        if batch.is_empty() {
            tx.commit().await.map_err(storage)?;
            return Ok(BatchOutcome::Empty);
        }
        debug!(rows = batch.len(), "Claimed outbox batch");

        let ids: Vec<i64> = batch.iter().map(|entry| entry.id).collect();
        let count = ids.len();
        let (status, outcome) = match sink.deliver(&batch).await {
            Ok(()) => (OutboxStatus::Sent, BatchOutcome::Sent(count)),
            Err(error) => {
                warn!(rows = count, error = %error, "Outbox batch failed");
                (OutboxStatus::Failed, BatchOutcome::Failed { count, error })
            }
        };

        sqlx::query("UPDATE outbox SET status = $1 WHERE id = ANY($2)")
            .bind(status.as_str())
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        Ok(outcome)
    }

    async fn entries(&self) -> Result<Vec<OutboxEntry>, OutboxError> {
        sqlx::query("SELECT id, topic, key, payload, status FROM outbox ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?
            .iter()
            .map(entry_from_row)
            .collect()
    }
}
