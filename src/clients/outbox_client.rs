use crate::clients::{BatchOutcome, OutboxError, OutboxSink, OutboxStore};
use crate::framework::{FrameworkError, ResourceClient};
use crate::model::{OutboxEntry, OutboxStatus};
use crate::order_actor::{LeaseId, OrderBook, OrderCommand, OrderError, OrderReply};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Client for the outbox side of the order actor.
///
/// A batch is leased by one command and settled by another. While leased, no
/// other publisher can claim those rows. If the caller goes away between the
/// two, the lease is released and the rows are pending again.
#[derive(Clone)]
pub struct OutboxClient {
    inner: ResourceClient<OrderBook>,
    next_lease: Arc<AtomicU64>,
}

impl OutboxClient {
    pub fn new(inner: ResourceClient<OrderBook>) -> Self {
        Self {
            inner,
            next_lease: Arc::new(AtomicU64::new(1)),
        }
    }

    fn lease(&self) -> Lease {
        Lease {
            client: self.inner.clone(),
            id: self.next_lease.fetch_add(1, Ordering::Relaxed),
            settled: false,
        }
    }

    async fn claim(&self, lease: &Lease, limit: usize) -> Result<Vec<OutboxEntry>, OrderError> {
        let command = OrderCommand::ClaimPending {
            lease: lease.id,
            limit,
        };
        match self.inner.call(command).await? {
            OrderReply::Claimed(batch) => Ok(batch),
            other => Err(unexpected(other)),
        }
    }

    async fn complete(&self, mut lease: Lease, status: OutboxStatus) -> Result<usize, OrderError> {
        let command = OrderCommand::CompletePending {
            lease: lease.id,
            status,
        };
        match self.inner.call(command).await? {
            OrderReply::Completed(settled) => {
                lease.settled = true;
                Ok(settled)
            }
            other => Err(unexpected(other)),
        }
    }
}

/// Releases its rows on drop unless the batch was settled.
///
/// Created before the claim is sent, so a caller dropped while waiting for
/// the claim reply still releases whatever the actor handed out.
struct Lease {
    client: ResourceClient<OrderBook>,
    id: LeaseId,
    settled: bool,
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Err(e) = self.client.notify(OrderCommand::ReleasePending { lease: self.id }) {
            warn!(lease = self.id, error = %e, "Could not release outbox lease");
        }
    }
}

fn unexpected(reply: OrderReply) -> OrderError {
    FrameworkError::UnexpectedReply(format!("{reply:?}")).into()
}

#[async_trait]
impl OutboxStore for OutboxClient {
    #[instrument(skip(self, sink))]
    async fn process_pending(
        &self,
        batch_size: usize,
        sink: &dyn OutboxSink,
    ) -> Result<BatchOutcome, OutboxError> {
        let mut lease = self.lease();
        let batch = self.claim(&lease, batch_size).await?;
        if batch.is_empty() {
            // nothing was leased
            lease.settled = true;
            return Ok(BatchOutcome::Empty);
        }
        debug!(rows = batch.len(), "Claimed outbox batch");

        let count = batch.len();
        match sink.deliver(&batch).await {
            Ok(()) => {
                self.complete(lease, OutboxStatus::Sent).await?;
                Ok(BatchOutcome::Sent(count))
            }
            Err(error) => {
                warn!(rows = count, error = %error, "Outbox batch failed");
                self.complete(lease, OutboxStatus::Failed).await?;
                Ok(BatchOutcome::Failed { count, error })
            }
        }
    }

    async fn entries(&self) -> Result<Vec<OutboxEntry>, OutboxError> {
        match self.inner.call(OrderCommand::Outbox).await? {
            OrderReply::Outbox(entries) => Ok(entries),
            other => Err(unexpected(other).into()),
        }
    }
}
