//! Stock ledger: per-SKU total/reserved counters behind a single actor.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use entity::StockBook;
pub use error::*;

use crate::clients::StockClient;
use crate::framework::ResourceActor;
use crate::model::Stock;

/// Creates a seeded stock actor and its client.
pub fn new(
    buffer_size: usize,
    seed: Vec<Stock>,
) -> Result<(ResourceActor<StockBook>, StockClient), StockError> {
    let book = StockBook::from_seed(seed)?;
    let (actor, generic_client) = ResourceActor::new(buffer_size, book);
    let client = StockClient::new(generic_client);

    Ok((actor, client))
}
