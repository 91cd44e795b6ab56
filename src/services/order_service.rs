//! The order state machine.
//!
//! Every transition has the same shape: move the order into an "-ing" status
//! with a compare-and-swap, run the stock batch, then move it to the target
//! status. If the stock batch fails, the "-ing" status is rolled back. If the
//! rollback fails as well, both errors are returned together and the order is
//! left in its "-ing" status, which marks it for reconciliation.

use crate::clients::{OrderLedger, StockLedger};
use crate::error::LomsError;
use crate::model::{CreateOrder, Order, OrderId, OrderStatus};
use crate::order_actor::OrderError;
use crate::telemetry::{Outcome, Telemetry};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderLedger>,
    stocks: Arc<dyn StockLedger>,
    telemetry: Arc<dyn Telemetry>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderLedger>,
        stocks: Arc<dyn StockLedger>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            orders,
            stocks,
            telemetry,
        }
    }

    /// Creates an order and reserves its stock.
    ///
    /// On a failed reservation the order ends in `failed` and
    /// [`LomsError::ReservedStockFailed`] is returned.
    #[instrument(skip(self, params), fields(user_id = params.user_id))]
    pub async fn create_order(&self, params: CreateOrder) -> Result<OrderId, LomsError> {
        self.observe("create_order", self.create(params)).await
    }

    #[instrument(skip(self))]
    pub async fn order_info(&self, order_id: OrderId) -> Result<Order, LomsError> {
        self.observe("order_info", self.info(order_id)).await
    }

    /// Pays for an order. Paying a `payed` order again is a no-op.
    #[instrument(skip(self))]
    pub async fn pay_order(&self, order_id: OrderId) -> Result<(), LomsError> {
        self.observe("pay_order", self.pay(order_id)).await
    }

    /// Cancels an unpaid order. Cancelling a `cancelled` order again is a no-op.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<(), LomsError> {
        self.observe("cancel_order", self.cancel(order_id)).await
    }

    async fn create(&self, params: CreateOrder) -> Result<OrderId, LomsError> {
        params.validate()?;
        let items = params.merged_items().map_err(OrderError::from)?;

        let order_id = self.orders.create(&params).await?;
        self.orders
            .update_status(order_id, OrderStatus::Reserving, OrderStatus::New)
            .await?;

        if let Err(source) = self.stocks.reserve(&items).await {
            warn!(order_id, error = %source, "Stock reservation failed");
            let failure = LomsError::ReservedStockFailed { order_id, source };
            return match self
                .orders
                .update_status(order_id, OrderStatus::Failed, OrderStatus::Reserving)
                .await
            {
                Ok(()) => Err(failure),
                Err(e) => Err(LomsError::compensation_failed(failure, e)),
            };
        }

        self.orders
            .update_status(order_id, OrderStatus::AwaitingPayment, OrderStatus::Reserving)
            .await?;
        info!(order_id, "Order created");
        Ok(order_id)
    }

    async fn info(&self, order_id: OrderId) -> Result<Order, LomsError> {
        validate_order_id(order_id)?;
        Ok(self.orders.get_by_id(order_id).await?)
    }

    async fn pay(&self, order_id: OrderId) -> Result<(), LomsError> {
        validate_order_id(order_id)?;
        let order = self.orders.get_by_id(order_id).await?;
        match order.status {
            OrderStatus::Payed => return Ok(()),
            OrderStatus::Cancelled | OrderStatus::Failed => {
                return Err(LomsError::InvalidOrderStatus {
                    order_id,
                    status: order.status,
                })
            }
            _ => {}
        }

        self.orders
            .update_status(order_id, OrderStatus::Paying, OrderStatus::AwaitingPayment)
            .await?;
        if let Err(e) = self.stocks.remove_reserved(&order.items).await {
            warn!(order_id, error = %e, "Settling reserved stock failed");
            return Err(self.roll_back(order_id, OrderStatus::Paying, e.into()).await);
        }
        self.orders
            .update_status(order_id, OrderStatus::Payed, OrderStatus::Paying)
            .await?;
        info!(order_id, "Order payed");
        Ok(())
    }

    async fn cancel(&self, order_id: OrderId) -> Result<(), LomsError> {
        validate_order_id(order_id)?;
        let order = self.orders.get_by_id(order_id).await?;
        match order.status {
            OrderStatus::Cancelled => return Ok(()),
            OrderStatus::Payed | OrderStatus::Failed => {
                return Err(LomsError::InvalidOrderStatus {
                    order_id,
                    status: order.status,
                })
            }
            _ => {}
        }

        self.orders
            .update_status(order_id, OrderStatus::Cancelling, OrderStatus::AwaitingPayment)
            .await?;
        if let Err(e) = self.stocks.cancel_reserved(&order.items).await {
            warn!(order_id, error = %e, "Releasing reserved stock failed");
            return Err(self.roll_back(order_id, OrderStatus::Cancelling, e.into()).await);
        }
        self.orders
            .update_status(order_id, OrderStatus::Cancelled, OrderStatus::Cancelling)
            .await?;
        info!(order_id, "Order cancelled");
        Ok(())
    }

    /// Moves an order from `from` back to `awaiting payment` after `cause`.
    async fn roll_back(&self, order_id: OrderId, from: OrderStatus, cause: LomsError) -> LomsError {
        match self
            .orders
            .update_status(order_id, OrderStatus::AwaitingPayment, from)
            .await
        {
            Ok(()) => cause,
            Err(e) => LomsError::compensation_failed(cause, e),
        }
    }

    async fn observe<T>(
        &self,
        operation: &'static str,
        request: impl Future<Output = Result<T, LomsError>>,
    ) -> Result<T, LomsError> {
        let started = Instant::now();
        let result = request.await;
        self.telemetry
            .record(operation, Outcome::of(&result), started.elapsed());
        result
    }
}

fn validate_order_id(order_id: OrderId) -> Result<(), LomsError> {
    if order_id < 1 {
        return Err(LomsError::InvalidOrderId { order_id });
    }
    Ok(())
}
