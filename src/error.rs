//! Service-level errors and their transport status codes.

use crate::model::{OrderId, OrderStatus, Sku, ValidationError};
use crate::order_actor::OrderError;
use crate::stock_actor::StockError;
use thiserror::Error;

/// Coarse classification a transport layer turns into a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    InvalidArgument,
    FailedPrecondition,
    Internal,
}

/// Errors returned by [`OrderService`](crate::services::OrderService) and
/// [`StockService`](crate::services::StockService).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LomsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    #[error("orderId must be greater than 0, having: {order_id}")]
    InvalidOrderId { order_id: OrderId },

    #[error("sku must be greater than 0, having: {sku}")]
    InvalidSku { sku: Sku },

    /// Stock could not be reserved; the order was moved to `failed`.
    #[error("reserve stock failed for order: {order_id}")]
    ReservedStockFailed {
        order_id: OrderId,
        #[source]
        source: StockError,
    },

    /// The order is in a status the operation can never start from.
    #[error("invalid order status for order: {order_id}, status: {status}")]
    InvalidOrderStatus {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Order(#[from] OrderError),

    /// A step failed and undoing it failed too. The order is left in an
    /// "-ing" status for an operator to reconcile.
    #[error("{cause}; compensation failed: {compensation}")]
    CompensationFailed {
        cause: Box<LomsError>,
        compensation: Box<LomsError>,
    },
}

impl LomsError {
    pub(crate) fn compensation_failed(
        cause: impl Into<LomsError>,
        compensation: impl Into<LomsError>,
    ) -> Self {
        LomsError::CompensationFailed {
            cause: Box::new(cause.into()),
            compensation: Box::new(compensation.into()),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LomsError::InvalidArgument(_)
            | LomsError::InvalidOrderId { .. }
            | LomsError::InvalidSku { .. } => ErrorCode::InvalidArgument,
            LomsError::ReservedStockFailed { .. } | LomsError::InvalidOrderStatus { .. } => {
                ErrorCode::FailedPrecondition
            }
            LomsError::Stock(e) => match e {
                StockError::NotFound { .. } => ErrorCode::NotFound,
                StockError::OutOfBounds { .. } => ErrorCode::FailedPrecondition,
                StockError::InvalidSeed { .. }
                | StockError::DuplicateSeed { .. }
                | StockError::Storage(_)
                | StockError::Actor(_) => ErrorCode::Internal,
            },
            LomsError::Order(e) => match e {
                OrderError::NotFound { .. } => ErrorCode::NotFound,
                OrderError::StatusMismatch { .. } => ErrorCode::FailedPrecondition,
                OrderError::Invalid(_) | OrderError::ItemOutOfBounds { .. } => {
                    ErrorCode::InvalidArgument
                }
                OrderError::Payload(_) | OrderError::Storage(_) | OrderError::Actor(_) => {
                    ErrorCode::Internal
                }
            },
            LomsError::CompensationFailed { .. } => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::FrameworkError;

    #[test]
    fn codes_follow_error_kind() {
        let cases = [
            (LomsError::InvalidOrderId { order_id: 0 }, ErrorCode::InvalidArgument),
            (ValidationError::NoItems.into(), ErrorCode::InvalidArgument),
            (StockError::NotFound { sku: 1 }.into(), ErrorCode::NotFound),
            (OrderError::NotFound { order_id: 1 }.into(), ErrorCode::NotFound),
            (
                StockError::OutOfBounds {
                    sku: 1,
                    reserved: 6,
                    total_count: 10,
                    change: 6,
                }
                .into(),
                ErrorCode::FailedPrecondition,
            ),
            (
                OrderError::StatusMismatch {
                    order_id: 1,
                    current: OrderStatus::Payed,
                    expected: OrderStatus::AwaitingPayment,
                }
                .into(),
                ErrorCode::FailedPrecondition,
            ),
            (
                LomsError::InvalidOrderStatus {
                    order_id: 1,
                    status: OrderStatus::Failed,
                },
                ErrorCode::FailedPrecondition,
            ),
            (
                StockError::Actor(FrameworkError::ActorClosed).into(),
                ErrorCode::Internal,
            ),
        ];
        for (error, code) in cases {
            assert_eq!(error.code(), code, "{error}");
        }
    }

    #[test]
    fn compensation_failure_is_internal_and_keeps_both_errors() {
        let error = LomsError::compensation_failed(
            StockError::NotFound { sku: 3 },
            OrderError::Storage("connection reset".into()),
        );
        assert_eq!(error.code(), ErrorCode::Internal);
        let message = error.to_string();
        assert!(message.contains("sku: 3"), "{message}");
        assert!(message.contains("connection reset"), "{message}");
    }
}
