//! Type-safe wrappers around [`ResourceClient`](crate::framework::ResourceClient),
//! and the ledger traits they implement.

pub mod order_client;
pub mod outbox_client;
pub mod stock_client;
pub mod traits;

pub use order_client::*;
pub use outbox_client::*;
pub use stock_client::*;
pub use traits::*;
