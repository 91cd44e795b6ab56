//! Error types for the order ledger.

use crate::framework::FrameworkError;
use crate::model::{ItemOverflow, OrderId, OrderStatus, Sku, ValidationError};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The requested order was not found.
    #[error("orderId is not found, having: {order_id}")]
    NotFound { order_id: OrderId },

    /// The compare-and-swap predicate did not hold.
    #[error("status mismatch for order: {order_id}, current: {current}, expected: {expected}")]
    StatusMismatch {
        order_id: OrderId,
        current: OrderStatus,
        expected: OrderStatus,
    },

    /// Merged item counts do not fit the item counter.
    #[error("order item sku: {sku}, total: {total} overflows the item count")]
    ItemOutOfBounds { sku: Sku, total: u64 },

    /// The order data provided is invalid.
    #[error("order validation error: {0}")]
    Invalid(#[from] ValidationError),

    /// The outbox payload could not be encoded.
    #[error("order event payload error: {0}")]
    Payload(String),

    /// An underlying database error occurred.
    #[error("order storage error: {0}")]
    Storage(String),

    /// An error occurred while communicating with the order actor.
    #[error("order actor communication error: {0}")]
    Actor(#[from] FrameworkError),
}

impl From<ItemOverflow> for OrderError {
    fn from(e: ItemOverflow) -> Self {
        OrderError::ItemOutOfBounds {
            sku: e.sku,
            total: e.total,
        }
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(e: serde_json::Error) -> Self {
        OrderError::Payload(e.to_string())
    }
}
