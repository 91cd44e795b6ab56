//! Commands accepted by the order ledger actor.
//!
//! The same actor owns the outbox rows, so a status write and the
//! notification it causes are always applied by one command.

use crate::model::{CreateOrder, Order, OrderId, OrderStatus, OutboxEntry, OutboxStatus};

/// Identifies one publisher's claim on a set of outbox rows.
pub type LeaseId = u64;

/// Commands for the [`OrderBook`](super::OrderBook) store.
#[derive(Debug, Clone)]
pub enum OrderCommand {
    Create(CreateOrder),
    Get(OrderId),
    /// Compare-and-swap: write `status` only if the stored one equals `expected`.
    UpdateStatus {
        order_id: OrderId,
        status: OrderStatus,
        expected: OrderStatus,
    },
    /// Lease up to `limit` pending outbox rows under `lease`.
    ClaimPending { lease: LeaseId, limit: usize },
    /// Settle every row held by `lease` as `sent` or `failed`.
    CompletePending { lease: LeaseId, status: OutboxStatus },
    /// Give the rows held by `lease` back to the pool, still pending.
    ReleasePending { lease: LeaseId },
    /// Every outbox row, oldest first.
    Outbox,
}

/// Results from OrderCommands - variants match 1:1 with OrderCommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderReply {
    Created(OrderId),
    Order(Order),
    StatusUpdated,
    Claimed(Vec<OutboxEntry>),
    Completed(usize),
    Released(usize),
    Outbox(Vec<OutboxEntry>),
}
