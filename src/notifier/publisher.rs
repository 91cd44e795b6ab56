//! Timer-driven outbox drain.

use crate::clients::{BatchOutcome, OutboxError, OutboxSink, OutboxStore};
use crate::model::OutboxEntry;
use crate::notifier::{Broker, BrokerError, BrokerMessage};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Polls the outbox on a fixed interval and forwards each batch to the broker.
///
/// A batch is sent as one unit. On success every row becomes `sent`; on any
/// failure every row becomes `failed` and stays that way until an operator
/// resets it.
pub struct OutboxPublisher {
    outbox: Arc<dyn OutboxStore>,
    broker: Arc<dyn Broker>,
    batch_size: usize,
    poll_interval: Duration,
}

impl OutboxPublisher {
    pub fn new(
        outbox: Arc<dyn OutboxStore>,
        broker: Arc<dyn Broker>,
        batch_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            outbox,
            broker,
            batch_size,
            poll_interval,
        }
    }

    /// Drains one batch.
    pub async fn tick(&self) -> Result<BatchOutcome, OutboxError> {
        self.outbox.process_pending(self.batch_size, self).await
    }

    /// Ticks until `shutdown` is cancelled.
    ///
    /// Cancellation is only observed between ticks, so a claimed batch is
    /// always settled before the loop exits.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            batch_size = self.batch_size,
            poll_ms = self.poll_interval.as_millis() as u64,
            "Outbox publisher started"
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.tick().await {
                Ok(BatchOutcome::Empty) => {}
                Ok(BatchOutcome::Sent(count)) => debug!(count, "Outbox batch sent"),
                Ok(BatchOutcome::Failed { count, error }) => {
                    warn!(count, error = %error, "Outbox batch marked failed")
                }
                Err(e) => error!(error = %e, "Outbox drain failed"),
            }
        }

        info!("Outbox publisher stopped");
    }
}

#[async_trait]
impl OutboxSink for OutboxPublisher {
    async fn deliver(&self, batch: &[OutboxEntry]) -> Result<(), BrokerError> {
        let messages: Vec<BrokerMessage> = batch
            .iter()
            .map(|entry| BrokerMessage {
                topic: entry.topic.clone(),
                key: entry.key.clone(),
                payload: entry.payload.clone(),
            })
            .collect();
        self.broker.send_messages(&messages).await
    }
}
