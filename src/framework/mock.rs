//! # Mock Framework
//!
//! Utilities for testing clients and services in isolation.
//!
//! Use [`MockClient`] to script the answers a store gives, in order, and to
//! inspect which commands were sent. Use [`create_mock_client`] with
//! [`expect_call`] when a test wants to answer each request by hand.

use crate::framework::{ActorState, ResourceClient, ResourceRequest, Response};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// A scripted answer for the next command the mock receives.
struct Expectation<S: ActorState> {
    response: Result<S::Reply, S::Error>,
}

/// A mock client with expectation tracking for fluent testing.
///
/// # Example
/// ```ignore
/// let mock = MockClient::<StockBook>::new();
/// mock.expect_call().return_err(StockError::NotFound { sku: 7 });
///
/// let stocks = StockClient::new(mock.client());
/// // Use stocks in tests...
/// mock.verify(); // Ensures all expectations were met
/// ```
pub struct MockClient<S: ActorState> {
    client: ResourceClient<S>,
    expectations: Arc<Mutex<VecDeque<Expectation<S>>>>,
    received: Arc<Mutex<Vec<S::Command>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<S: ActorState> MockClient<S> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<S>>(100);
        let expectations = Arc::new(Mutex::new(VecDeque::<Expectation<S>>::new()));
        let received = Arc::new(Mutex::new(Vec::new()));
        let expectations_clone = expectations.clone();
        let received_clone = received.clone();

        // Spawn background task to handle requests
        let handle = tokio::spawn(async move {
            while let Some(ResourceRequest { command, respond_to }) = receiver.recv().await {
                let expectation = expectations_clone.lock().unwrap().pop_front();
                received_clone.lock().unwrap().push(command);

                match expectation {
                    Some(Expectation { response }) => {
                        let _ = respond_to.send(response);
                    }
                    None => panic!("Unexpected request: no expectation left"),
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            received,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<S> {
        self.client.clone()
    }

    /// Expects one more command, answered in FIFO order.
    pub fn expect_call(&self) -> CallExpectationBuilder<S> {
        CallExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Drains the commands received so far.
    pub fn take_received(&self) -> Vec<S::Command> {
        std::mem::take(&mut *self.received.lock().unwrap())
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

impl<S: ActorState> Default for MockClient<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for call expectations.
pub struct CallExpectationBuilder<S: ActorState> {
    expectations: Arc<Mutex<VecDeque<Expectation<S>>>>,
}

impl<S: ActorState> CallExpectationBuilder<S> {
    /// Sets the expectation to return a successful reply.
    pub fn return_ok(self, reply: S::Reply) {
        self.expectations.lock().unwrap().push_back(Expectation {
            response: Ok(reply),
        });
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: S::Error) {
        self.expectations.lock().unwrap().push_back(Expectation {
            response: Err(error),
        });
    }
}

// =============================================================================
// LOW-LEVEL HELPERS
// =============================================================================

/// Creates a mock client and a receiver for asserting requests.
///
/// The test owns the receiving end, so it can look at each command as it
/// arrives and decide how (or whether) to answer.
pub fn create_mock_client<S: ActorState>(
    buffer_size: usize,
) -> (ResourceClient<S>, mpsc::Receiver<ResourceRequest<S>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to pull the next command and its responder off the receiver.
pub async fn expect_call<S: ActorState>(
    receiver: &mut mpsc::Receiver<ResourceRequest<S>>,
) -> Option<(S::Command, Response<S>)> {
    receiver
        .recv()
        .await
        .map(|ResourceRequest { command, respond_to }| (command, respond_to))
}
