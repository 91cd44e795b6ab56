use crate::clients::StockLedger;
use crate::framework::{FrameworkError, ResourceClient};
use crate::model::{OrderItem, Sku, Stock};
use crate::stock_actor::{StockBook, StockCommand, StockError, StockReply};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Client for interacting with the stock actor.
#[derive(Clone)]
pub struct StockClient {
    inner: ResourceClient<StockBook>,
}

impl StockClient {
    pub fn new(inner: ResourceClient<StockBook>) -> Self {
        Self { inner }
    }
}

fn unexpected(reply: StockReply) -> StockError {
    FrameworkError::UnexpectedReply(format!("{reply:?}")).into()
}

#[async_trait]
impl StockLedger for StockClient {
    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn reserve(&self, items: &[OrderItem]) -> Result<(), StockError> {
        debug!("Sending request");
        match self.inner.call(StockCommand::Reserve(items.to_vec())).await? {
            StockReply::Reserved => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn remove_reserved(&self, items: &[OrderItem]) -> Result<(), StockError> {
        debug!("Sending request");
        match self
            .inner
            .call(StockCommand::RemoveReserved(items.to_vec()))
            .await?
        {
            StockReply::RemovedReserved => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn cancel_reserved(&self, items: &[OrderItem]) -> Result<(), StockError> {
        debug!("Sending request");
        match self
            .inner
            .call(StockCommand::CancelReserved(items.to_vec()))
            .await?
        {
            StockReply::CancelledReserved => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    async fn available(&self, sku: Sku) -> Result<u32, StockError> {
        debug!("Sending request");
        match self.inner.call(StockCommand::Available(sku)).await? {
            StockReply::Available(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    async fn stock(&self, sku: Sku) -> Result<Stock, StockError> {
        debug!("Sending request");
        match self.inner.call(StockCommand::Snapshot(sku)).await? {
            StockReply::Snapshot(stock) => Ok(stock),
            other => Err(unexpected(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockClient;

    #[tokio::test]
    async fn reserve_forwards_the_whole_batch() {
        let mock = MockClient::<StockBook>::new();
        mock.expect_call().return_ok(StockReply::Reserved);

        let stocks = StockClient::new(mock.client());
        let items = [OrderItem::new(1, 2), OrderItem::new(4, 1)];
        stocks.reserve(&items).await.unwrap();

        let received = mock.take_received();
        assert!(matches!(&received[..], [StockCommand::Reserve(sent)] if sent == &items));
        mock.verify();
    }

    #[tokio::test]
    async fn mismatched_reply_is_reported_not_panicked() {
        let mock = MockClient::<StockBook>::new();
        mock.expect_call().return_ok(StockReply::Reserved);

        let stocks = StockClient::new(mock.client());
        let err = stocks.available(1).await.unwrap_err();
        assert!(matches!(
            err,
            StockError::Actor(FrameworkError::UnexpectedReply(_))
        ));
    }
}
