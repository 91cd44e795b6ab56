//! Pure data structures shared by the ledgers, the services and the publisher.

pub mod order;
pub mod outbox;
pub mod stock;

pub use order::*;
pub use outbox::*;
pub use stock::*;
