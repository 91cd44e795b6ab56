//! # Core Actor Framework
//!
//! This module defines the generic building blocks for the ledger actors.
//!
//! ## Key Types
//!
//! - [`ActorState`]: The trait that every in-memory store must implement.
//! - [`ResourceActor`]: The generic actor that owns a store and applies commands.
//! - [`ResourceClient`]: The generic client for communicating with actors.
//! - [`FrameworkError`]: Channel-level failures (actor closed, reply dropped).

use std::fmt::Debug;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that a resource store must implement to be managed by [`ResourceActor`].
///
/// # Architecture Note
/// The state owns its *whole* collection (every SKU, every order) rather than a
/// single entity. A command may touch many records at once (a stock batch spans
/// several SKUs), and the actor applies it as one unit.
///
/// `handle` is deliberately synchronous. Once the actor has dequeued a command
/// the mutation runs to completion, so a caller that gives up (drops its future,
/// hits a deadline) can never leave the store half-applied.
///
/// Replies follow the "variants match 1:1" convention: `Command::Reserve` is
/// answered by `Reply::Reserved`, and so on.
pub trait ActorState: Send + 'static {
    /// The operations this store accepts.
    type Command: Send + Debug;

    /// The result type returned by commands.
    type Reply: Send + Debug;

    /// The per-store error type. Channel failures convert into it.
    type Error: std::error::Error + From<FrameworkError> + Send + 'static;

    /// Apply one command to the store.
    fn handle(&mut self, command: Self::Command) -> Result<Self::Reply, Self::Error>;

    /// Number of records held, used for lifecycle logging.
    fn size(&self) -> usize {
        0
    }
}

// =============================================================================
// 2. THE GENERIC MESSAGES & ERRORS
// =============================================================================

/// Errors that can occur within the actor framework itself.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
    #[error("Actor mailbox full")]
    MailboxFull,
}

/// Type alias for the one-shot response channel used by actors.
pub type Response<S> =
    oneshot::Sender<Result<<S as ActorState>::Reply, <S as ActorState>::Error>>;

/// Envelope sent to the actor: the command plus where to send the answer.
pub struct ResourceRequest<S: ActorState> {
    pub command: S::Command,
    pub respond_to: Response<S>,
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

/// The generic actor that owns a store.
///
/// **Concurrency Model**:
/// Every command for a store goes through one channel and is applied by one
/// task, in arrival order. This is the same guarantee a single exclusive lock
/// around the whole map would give, without a `Mutex` in sight: no observer
/// can see a batch that has been validated but only partly applied.
pub struct ResourceActor<S: ActorState> {
    receiver: mpsc::Receiver<ResourceRequest<S>>,
    state: S,
}

impl<S: ActorState> ResourceActor<S> {
    pub fn new(buffer_size: usize, state: S) -> (Self, ResourceClient<S>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self { receiver, state };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    /// Runs the actor's event loop, processing commands until every client is dropped.
    pub async fn run(mut self) {
        // Extract just the type name (e.g., "StockBook" instead of "loms::stock_actor::entity::StockBook")
        let entity_type = std::any::type_name::<S>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, size = self.state.size(), "Actor started");

        while let Some(ResourceRequest { command, respond_to }) = self.receiver.recv().await {
            debug!(entity_type, ?command, "Command");
            let result = self.state.handle(command);
            match &result {
                Ok(reply) => debug!(entity_type, ?reply, "Command ok"),
                Err(e) => warn!(entity_type, error = %e, "Command failed"),
            }
            // The caller may have gone away; the command has been applied regardless.
            let _ = respond_to.send(result);
        }

        info!(entity_type, size = self.state.size(), "Shutdown");
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

/// A type-safe client for interacting with a [`ResourceActor`].
pub struct ResourceClient<S: ActorState> {
    sender: mpsc::Sender<ResourceRequest<S>>,
}

impl<S: ActorState> Clone for ResourceClient<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S: ActorState> ResourceClient<S> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<S>>) -> Self {
        Self { sender }
    }

    /// Send a command and wait for the store's answer.
    pub async fn call(&self, command: S::Command) -> Result<S::Reply, S::Error> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ResourceRequest {
                command,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    /// Queue a command without waiting for the answer.
    ///
    /// Safe to call from `Drop`. If the mailbox is full the send is finished
    /// on a spawned task, which needs a running runtime.
    pub fn notify(&self, command: S::Command) -> Result<(), FrameworkError> {
        let (respond_to, _) = oneshot::channel();
        match self.sender.try_send(ResourceRequest {
            command,
            respond_to,
        }) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(FrameworkError::ActorClosed),
            Err(mpsc::error::TrySendError::Full(request)) => {
                let runtime = tokio::runtime::Handle::try_current()
                    .map_err(|_| FrameworkError::MailboxFull)?;
                let sender = self.sender.clone();
                runtime.spawn(async move {
                    let _ = sender.send(request).await;
                });
                Ok(())
            }
        }
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================
