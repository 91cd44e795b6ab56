use super::{OrderId, OrderStatus, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Body of every order-status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStateMessage {
    pub order_id: OrderId,
    pub user_id: UserId,
    /// `None` when the order has just been created.
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
}

impl OrderStateMessage {
    /// Decide whether moving an order to `new_status` must be announced.
    ///
    /// `visible` is the last status consumers were told about (`None` before
    /// creation). In-flight statuses and rollbacks to the visible status are
    /// not announced.
    pub fn for_transition(
        order_id: OrderId,
        user_id: UserId,
        visible: Option<OrderStatus>,
        new_status: OrderStatus,
    ) -> Option<Self> {
        if new_status.is_transitional() || visible == Some(new_status) {
            return None;
        }
        Some(Self {
            order_id,
            user_id,
            from_status: visible,
            to_status: new_status,
        })
    }

    /// Partition key for the broker.
    pub fn key(&self) -> String {
        self.user_id.to_string()
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Delivery status of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "sent" => Ok(OutboxStatus::Sent),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(format!("unknown outbox status: {other}")),
        }
    }
}

/// A row of the outbox. Ids grow with insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub id: i64,
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub status: OutboxStatus,
}

impl OutboxEntry {
    pub fn decode(&self) -> Result<OrderStateMessage, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_is_announced_without_from_status() {
        let message = OrderStateMessage::for_transition(1, 7, None, OrderStatus::New).unwrap();
        assert_eq!(message.from_status, None);
        assert_eq!(message.key(), "7");
    }

    #[test]
    fn transitional_statuses_are_never_announced() {
        for status in [
            OrderStatus::Reserving,
            OrderStatus::Paying,
            OrderStatus::Cancelling,
        ] {
            assert!(OrderStateMessage::for_transition(1, 1, Some(OrderStatus::New), status).is_none());
        }
    }

    #[test]
    fn rollback_to_visible_status_is_silent() {
        let visible = Some(OrderStatus::AwaitingPayment);
        assert!(
            OrderStateMessage::for_transition(1, 1, visible, OrderStatus::AwaitingPayment).is_none()
        );
        let paid = OrderStateMessage::for_transition(1, 1, visible, OrderStatus::Payed).unwrap();
        assert_eq!(paid.from_status, visible);
    }

    #[test]
    fn payload_uses_wire_names() {
        let message = OrderStateMessage {
            order_id: 3,
            user_id: 9,
            from_status: Some(OrderStatus::New),
            to_status: OrderStatus::AwaitingPayment,
        };
        let json: serde_json::Value = serde_json::from_slice(&message.encode().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "order_id": 3,
                "user_id": 9,
                "from_status": "new",
                "to_status": "awaiting payment"
            })
        );
    }
}
