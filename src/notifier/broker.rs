//! Broker seam, startup connection retry, and an in-process broker.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One message as the broker sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Connect(String),

    #[error("broker send failed: {0}")]
    Send(String),

    #[error("broker still unreachable after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("broker connection cancelled by shutdown")]
    Cancelled,
}

/// A connected producer. Sends are synchronous: `Ok` means every message
/// of the batch was accepted.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn send_messages(&self, messages: &[BrokerMessage]) -> Result<(), BrokerError>;
}

#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Broker>, BrokerError>;
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Wait after the `attempt`-th failure (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Connects, retrying with backoff until the policy runs out or `shutdown` fires.
pub async fn connect_with_retry(
    connector: &dyn BrokerConnector,
    policy: &RetryPolicy,
    shutdown: &CancellationToken,
) -> Result<Arc<dyn Broker>, BrokerError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match connector.connect().await {
            Ok(broker) => {
                info!(attempt, "Connected to broker");
                return Ok(broker);
            }
            Err(e) => e,
        };
        if attempt >= policy.max_attempts {
            return Err(BrokerError::RetriesExhausted {
                attempts: attempt,
                last: error.to_string(),
            });
        }

        let backoff = policy.backoff(attempt);
        warn!(
            attempt,
            error = %error,
            backoff_ms = backoff.as_millis() as u64,
            "Broker connect failed, retrying"
        );
        tokio::select! {
            _ = shutdown.cancelled() => return Err(BrokerError::Cancelled),
            _ = tokio::time::sleep(backoff) => {}
        }
    }
}

#[derive(Debug, Default)]
struct MemoryBrokerState {
    delivered: Mutex<Vec<BrokerMessage>>,
    fail_sends: AtomicBool,
    connect_failures: AtomicU32,
}

/// In-process broker that keeps every delivered message.
///
/// Clones share the same log. It is its own connector, so it can be handed
/// to [`connect_with_retry`] directly.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    state: Arc<MemoryBrokerState>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Refuse the next `count` connection attempts.
    pub fn fail_next_connects(&self, count: u32) {
        self.state.connect_failures.store(count, Ordering::SeqCst);
    }

    pub async fn delivered(&self) -> Vec<BrokerMessage> {
        self.state.delivered.lock().await.clone()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn send_messages(&self, messages: &[BrokerMessage]) -> Result<(), BrokerError> {
        if self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(BrokerError::Send("broker rejected the batch".into()));
        }
        self.state
            .delivered
            .lock()
            .await
            .extend_from_slice(messages);
        Ok(())
    }
}

#[async_trait]
impl BrokerConnector for MemoryBroker {
    async fn connect(&self) -> Result<Arc<dyn Broker>, BrokerError> {
        let refused = self
            .state
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(BrokerError::Connect("connection refused".into()));
        }
        Ok(Arc::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
        };
        let waits: Vec<u128> = (1..=5).map(|a| policy.backoff(a).as_millis()).collect();
        assert_eq!(waits, vec![100, 200, 400, 500, 500]);
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn connects_after_transient_failures() {
        let broker = MemoryBroker::new();
        broker.fail_next_connects(2);

        let connected = connect_with_retry(&broker, &quick(3), &CancellationToken::new()).await;
        assert!(connected.is_ok());
    }

    #[tokio::test]
    async fn gives_up_when_attempts_run_out() {
        let broker = MemoryBroker::new();
        broker.fail_next_connects(5);

        let err = connect_with_retry(&broker, &quick(3), &CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BrokerError::RetriesExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn shutdown_interrupts_the_backoff() {
        let broker = MemoryBroker::new();
        broker.fail_next_connects(1);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let policy = RetryPolicy {
            max_attempts: 5,
            base_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(60),
        };
        let err = connect_with_retry(&broker, &policy, &shutdown)
            .await
            .err()
            .unwrap();
        assert_eq!(err, BrokerError::Cancelled);
    }

    #[tokio::test]
    async fn failing_sends_deliver_nothing() {
        let broker = MemoryBroker::new();
        broker.set_fail_sends(true);
        let message = BrokerMessage {
            topic: "t".into(),
            key: "1".into(),
            payload: b"{}".to_vec(),
        };
        assert!(broker.send_messages(&[message.clone()]).await.is_err());

        broker.set_fail_sends(false);
        broker.send_messages(&[message.clone()]).await.unwrap();
        assert_eq!(broker.delivered().await, vec![message]);
    }
}
