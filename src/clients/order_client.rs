use crate::clients::OrderLedger;
use crate::framework::{FrameworkError, ResourceClient};
use crate::model::{CreateOrder, Order, OrderId, OrderStatus};
use crate::order_actor::{OrderBook, OrderCommand, OrderError, OrderReply};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Client for the order side of the order actor.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<OrderBook>,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<OrderBook>) -> Self {
        Self { inner }
    }
}

fn unexpected(reply: OrderReply) -> OrderError {
    FrameworkError::UnexpectedReply(format!("{reply:?}")).into()
}

#[async_trait]
impl OrderLedger for OrderClient {
    #[instrument(skip(self, params), fields(user_id = params.user_id))]
    async fn create(&self, params: &CreateOrder) -> Result<OrderId, OrderError> {
        debug!("Sending request");
        match self.inner.call(OrderCommand::Create(params.clone())).await? {
            OrderReply::Created(order_id) => Ok(order_id),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, order_id: OrderId) -> Result<Order, OrderError> {
        debug!("Sending request");
        match self.inner.call(OrderCommand::Get(order_id)).await? {
            OrderReply::Order(order) => Ok(order),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        expected: OrderStatus,
    ) -> Result<(), OrderError> {
        debug!("Sending request");
        let command = OrderCommand::UpdateStatus {
            order_id,
            status,
            expected,
        };
        match self.inner.call(command).await? {
            OrderReply::StatusUpdated => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}
