//! Ledger seams the services are written against.
//!
//! The in-memory clients and the Postgres stores both implement these, so
//! [`OrderService`](crate::services::OrderService) and the
//! [`OutboxPublisher`](crate::notifier::OutboxPublisher) never know which
//! backend they are talking to.

use crate::model::{CreateOrder, Order, OrderId, OrderItem, OrderStatus, OutboxEntry, Sku, Stock};
use crate::notifier::BrokerError;
use crate::order_actor::OrderError;
use crate::stock_actor::StockError;
use async_trait::async_trait;
use thiserror::Error;

/// Per-SKU counters with all-or-nothing batch updates.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Hold units for every line, or for none of them.
    async fn reserve(&self, items: &[OrderItem]) -> Result<(), StockError>;

    /// Settle a paid order: lower both `reserved` and `total_count`.
    async fn remove_reserved(&self, items: &[OrderItem]) -> Result<(), StockError>;

    /// Release a hold: lower `reserved` only.
    async fn cancel_reserved(&self, items: &[OrderItem]) -> Result<(), StockError>;

    /// `total_count - reserved` for one SKU.
    async fn available(&self, sku: Sku) -> Result<u32, StockError>;

    /// Full counters for one SKU.
    async fn stock(&self, sku: Sku) -> Result<Stock, StockError>;
}

/// Order records whose status only moves through a compare-and-swap.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn create(&self, params: &CreateOrder) -> Result<OrderId, OrderError>;

    /// The order with its items sorted by SKU.
    async fn get_by_id(&self, order_id: OrderId) -> Result<Order, OrderError>;

    /// Writes `status` only if the stored status equals `expected`.
    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        expected: OrderStatus,
    ) -> Result<(), OrderError>;
}

/// Where a claimed outbox batch is delivered.
#[async_trait]
pub trait OutboxSink: Send + Sync {
    async fn deliver(&self, batch: &[OutboxEntry]) -> Result<(), BrokerError>;
}

/// What one drain of the outbox did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing was pending.
    Empty,
    /// Every row of the batch was delivered and marked `sent`.
    Sent(usize),
    /// Delivery failed; every row of the batch was marked `failed`.
    Failed { count: usize, error: BrokerError },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OutboxError {
    #[error(transparent)]
    Ledger(#[from] OrderError),

    #[error("outbox storage error: {0}")]
    Storage(String),
}

/// Pending notification rows, claimed by at most one publisher at a time.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Claims up to `batch_size` pending rows, hands them to `sink`, and marks
    /// the whole batch `sent` or `failed` by the outcome.
    async fn process_pending(
        &self,
        batch_size: usize,
        sink: &dyn OutboxSink,
    ) -> Result<BatchOutcome, OutboxError>;

    /// Every row, oldest first.
    async fn entries(&self) -> Result<Vec<OutboxEntry>, OutboxError>;
}
