//! Commands accepted by the stock ledger actor.
//!
//! Every mutating command carries a whole batch of `(sku, count)` lines and is
//! applied as one unit: either every line is applied or none is.

use crate::model::{OrderItem, Sku, Stock};

/// Commands for the [`StockBook`](super::StockBook) store.
#[derive(Debug, Clone)]
pub enum StockCommand {
    /// Hold units for an unpaid order.
    Reserve(Vec<OrderItem>),
    /// Settle a paid order: the units leave both `reserved` and `total_count`.
    RemoveReserved(Vec<OrderItem>),
    /// Release a hold after a cancellation or rollback.
    CancelReserved(Vec<OrderItem>),
    /// Units that can still be sold.
    Available(Sku),
    /// Full counters for one SKU.
    Snapshot(Sku),
}

/// Results from StockCommands - variants match 1:1 with StockCommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockReply {
    Reserved,
    RemovedReserved,
    CancelledReserved,
    Available(u32),
    Snapshot(Stock),
}
