//! Order ledger: order records, their status CAS, and the outbox written alongside.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use entity::OrderBook;
pub use error::*;

use crate::clients::{OrderClient, OutboxClient};
use crate::framework::ResourceActor;

/// Creates a new order actor plus the two clients that share it.
///
/// [`OrderClient`] serves the orchestrator; [`OutboxClient`] serves the publisher.
pub fn new(
    buffer_size: usize,
    topic: impl Into<String>,
) -> (ResourceActor<OrderBook>, OrderClient, OutboxClient) {
    let (actor, generic_client) = ResourceActor::new(buffer_size, OrderBook::new(topic));
    let orders = OrderClient::new(generic_client.clone());
    let outbox = OutboxClient::new(generic_client);

    (actor, orders, outbox)
}
