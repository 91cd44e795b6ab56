//! [`ActorState`] implementation for the order ledger and its outbox.
//!
//! Orders are never deleted. Their status only changes through
//! [`OrderBook::update_status`], a compare-and-swap. Whenever the externally
//! visible status changes, the notification row is appended in the same
//! command, so the two can't diverge.

use super::actions::{LeaseId, OrderCommand, OrderReply};
use super::error::OrderError;
use crate::framework::ActorState;
use crate::model::{
    CreateOrder, Order, OrderId, OrderStateMessage, OrderStatus, OutboxEntry, OutboxStatus,
};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct OrderRecord {
    order: Order,
    /// Last status announced to consumers; never an "-ing" status.
    visible_status: OrderStatus,
}

/// In-memory order ledger state, outbox included.
#[derive(Debug, Clone)]
pub struct OrderBook {
    orders: HashMap<OrderId, OrderRecord>,
    last_id: OrderId,
    outbox: Vec<OutboxEntry>,
    /// Every row before this index has been settled.
    first_pending: usize,
    /// Rows handed to a publisher and not yet settled.
    claimed: HashSet<i64>,
    leases: HashMap<LeaseId, Vec<i64>>,
    topic: String,
}

impl OrderBook {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            orders: HashMap::new(),
            last_id: 0,
            outbox: Vec::new(),
            first_pending: 0,
            claimed: HashSet::new(),
            leases: HashMap::new(),
            topic: topic.into(),
        }
    }

    /// Stores a new order in status `new` and announces it.
    pub fn create(&mut self, params: CreateOrder) -> Result<OrderId, OrderError> {
        params.validate()?;
        let items = params.merged_items()?;
        let order_id = self.last_id + 1;

        let message =
            OrderStateMessage::for_transition(order_id, params.user_id, None, OrderStatus::New);
        let entry = self.outbox_entry(message)?;

        self.last_id = order_id;
        self.orders.insert(
            order_id,
            OrderRecord {
                order: Order::new(order_id, params.user_id, OrderStatus::New, items),
                visible_status: OrderStatus::New,
            },
        );
        self.outbox.extend(entry);
        Ok(order_id)
    }

    pub fn get(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut order = self
            .orders
            .get(&order_id)
            .map(|record| record.order.clone())
            .ok_or(OrderError::NotFound { order_id })?;
        order.sort_items();
        Ok(order)
    }

    /// Compare-and-swap on the order status.
    pub fn update_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        expected: OrderStatus,
    ) -> Result<(), OrderError> {
        let record = self
            .orders
            .get(&order_id)
            .ok_or(OrderError::NotFound { order_id })?;
        if record.order.status != expected {
            return Err(OrderError::StatusMismatch {
                order_id,
                current: record.order.status,
                expected,
            });
        }

        let message = OrderStateMessage::for_transition(
            order_id,
            record.order.user_id,
            Some(record.visible_status),
            status,
        );
        // Encode before touching anything so a failure leaves the order as it was.
        let entry = self.outbox_entry(message)?;

        if let Some(record) = self.orders.get_mut(&order_id) {
            record.order.status = status;
            if !status.is_transitional() {
                record.visible_status = status;
            }
        }
        self.outbox.extend(entry);
        Ok(())
    }

    /// Leases the oldest pending rows that no other publisher holds.
    pub fn claim_pending(&mut self, lease: LeaseId, limit: usize) -> Vec<OutboxEntry> {
        let batch: Vec<OutboxEntry> = self.outbox[self.first_pending..]
            .iter()
            .filter(|entry| entry.status == OutboxStatus::Pending && !self.claimed.contains(&entry.id))
            .take(limit)
            .cloned()
            .collect();
        if !batch.is_empty() {
            let ids = self.leases.entry(lease).or_default();
            for entry in &batch {
                self.claimed.insert(entry.id);
                ids.push(entry.id);
            }
        }
        batch
    }

    /// Settles every row held by `lease`. Unknown leases settle nothing.
    pub fn complete_pending(&mut self, lease: LeaseId, status: OutboxStatus) -> usize {
        let Some(ids) = self.leases.remove(&lease) else {
            return 0;
        };
        let mut settled = 0;
        for id in ids {
            self.claimed.remove(&id);
            if let Some(entry) = self.entry_mut(id) {
                entry.status = status;
                settled += 1;
            }
        }
        while self
            .outbox
            .get(self.first_pending)
            .is_some_and(|entry| entry.status != OutboxStatus::Pending)
        {
            self.first_pending += 1;
        }
        settled
    }

    /// Drops a lease without settling it, so its rows can be claimed again.
    pub fn release_pending(&mut self, lease: LeaseId) -> usize {
        let Some(ids) = self.leases.remove(&lease) else {
            return 0;
        };
        for id in &ids {
            self.claimed.remove(id);
        }
        ids.len()
    }

    fn entry_mut(&mut self, id: i64) -> Option<&mut OutboxEntry> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.outbox.get_mut(index)
    }

    pub fn outbox(&self) -> &[OutboxEntry] {
        &self.outbox
    }

    fn outbox_entry(
        &self,
        message: Option<OrderStateMessage>,
    ) -> Result<Option<OutboxEntry>, OrderError> {
        let Some(message) = message else {
            return Ok(None);
        };
        Ok(Some(OutboxEntry {
            id: self.outbox.len() as i64 + 1,
            topic: self.topic.clone(),
            key: message.key(),
            payload: message.encode()?,
            status: OutboxStatus::Pending,
        }))
    }
}

impl ActorState for OrderBook {
    type Command = OrderCommand;
    type Reply = OrderReply;
    type Error = OrderError;

    fn handle(&mut self, command: OrderCommand) -> Result<OrderReply, OrderError> {
        match command {
            OrderCommand::Create(params) => self.create(params).map(OrderReply::Created),
            OrderCommand::Get(order_id) => self.get(order_id).map(OrderReply::Order),
            OrderCommand::UpdateStatus {
                order_id,
                status,
                expected,
            } => {
                self.update_status(order_id, status, expected)?;
                Ok(OrderReply::StatusUpdated)
            }
            OrderCommand::ClaimPending { lease, limit } => {
                Ok(OrderReply::Claimed(self.claim_pending(lease, limit)))
            }
            OrderCommand::CompletePending { lease, status } => {
                Ok(OrderReply::Completed(self.complete_pending(lease, status)))
            }
            OrderCommand::ReleasePending { lease } => {
                Ok(OrderReply::Released(self.release_pending(lease)))
            }
            OrderCommand::Outbox => Ok(OrderReply::Outbox(self.outbox.clone())),
        }
    }

    fn size(&self) -> usize {
        self.orders.len()
    }
}
