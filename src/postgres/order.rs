use crate::clients::OrderLedger;
use crate::model::{CreateOrder, Order, OrderId, OrderItem, OrderStateMessage, OrderStatus};
use crate::order_actor::OrderError;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use tracing::{debug, instrument};

fn storage(e: sqlx::Error) -> OrderError {
    OrderError::Storage(e.to_string())
}

fn parse_status(raw: &str) -> Result<OrderStatus, OrderError> {
    raw.parse()
        .map_err(|e: crate::model::UnknownStatus| OrderError::Storage(e.to_string()))
}

/// Orders and their outbox rows, written in the same transaction.
#[derive(Clone)]
pub struct PgOrderLedger {
    pool: PgPool,
    topic: String,
}

impl PgOrderLedger {
    pub fn new(pool: PgPool, topic: impl Into<String>) -> Self {
        Self {
            pool,
            topic: topic.into(),
        }
    }

    async fn append_outbox(
        &self,
        conn: &mut PgConnection,
        message: Option<OrderStateMessage>,
    ) -> Result<(), OrderError> {
        let Some(message) = message else {
            return Ok(());
        };
        sqlx::query("INSERT INTO outbox (topic, key, payload) VALUES ($1, $2, $3)")
            .bind(&self.topic)
            .bind(message.key())
            .bind(message.encode()?)
            .execute(&mut *conn)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl OrderLedger for PgOrderLedger {
    #[instrument(skip(self, params), fields(user_id = params.user_id))]
    async fn create(&self, params: &CreateOrder) -> Result<OrderId, OrderError> {
        params.validate()?;
        let items = params.merged_items()?;

        let mut tx = self.pool.begin().await.map_err(storage)?;
        let order_id: OrderId = sqlx::query_scalar(
            "INSERT INTO orders (user_id, status, visible_status) VALUES ($1, $2, $2) RETURNING id",
        )
        .bind(params.user_id)
        .bind(OrderStatus::New.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;

        for item in &items {
            sqlx::query("INSERT INTO order_items (order_id, sku, count) VALUES ($1, $2, $3)")
                .bind(order_id)
                .bind(item.sku)
                .bind(i64::from(item.count))
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
        }

        let message =
            OrderStateMessage::for_transition(order_id, params.user_id, None, OrderStatus::New);
        self.append_outbox(&mut tx, message).await?;
        tx.commit().await.map_err(storage)?;
        debug!(order_id, "Order stored");
        Ok(order_id)
    }

    async fn get_by_id(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let row = sqlx::query("SELECT user_id, status FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or(OrderError::NotFound { order_id })?;
        let user_id: i64 = row.try_get("user_id").map_err(storage)?;
        let status = parse_status(row.try_get("status").map_err(storage)?)?;

        let items = sqlx::query("SELECT sku, count FROM order_items WHERE order_id = $1 ORDER BY sku")
            .bind(order_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?
            .iter()
            .map(|row| -> Result<OrderItem, OrderError> {
                let count: i64 = row.try_get("count").map_err(storage)?;
                let count = u32::try_from(count)
                    .map_err(|_| OrderError::Storage(format!("item count out of range: {count}")))?;
                Ok(OrderItem::new(row.try_get("sku").map_err(storage)?, count))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Order::new(order_id, user_id, status, items))
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        expected: OrderStatus,
    ) -> Result<(), OrderError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let row = sqlx::query(
            "SELECT user_id, status, visible_status FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?
        .ok_or(OrderError::NotFound { order_id })?;

        let user_id: i64 = row.try_get("user_id").map_err(storage)?;
        let current = parse_status(row.try_get("status").map_err(storage)?)?;
        let visible = parse_status(row.try_get("visible_status").map_err(storage)?)?;
        if current != expected {
            return Err(OrderError::StatusMismatch {
                order_id,
                current,
                expected,
            });
        }

        let next_visible = if status.is_transitional() { visible } else { status };
        sqlx::query(
            "UPDATE orders SET status = $2, visible_status = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .bind(status.as_str())
        .bind(next_visible.as_str())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        let message = OrderStateMessage::for_transition(order_id, user_id, Some(visible), status);
        self.append_outbox(&mut tx, message).await?;
        tx.commit().await.map_err(storage)?;
        Ok(())
    }
}
