//! Delivery of outbox rows to the message broker.

pub mod broker;
pub mod publisher;

pub use broker::*;
pub use publisher::OutboxPublisher;
