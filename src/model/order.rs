use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type OrderId = i64;
pub type UserId = i64;
pub type Sku = i64;

/// Lifecycle status of an order.
///
/// Statuses ending in "-ing" mark a transition in flight. They are visible to
/// internal callers through `get_by_id`, but never announced to downstream
/// consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "new")]
    New,
    #[serde(rename = "reserving")]
    Reserving,
    #[serde(rename = "awaiting payment")]
    AwaitingPayment,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "paying")]
    Paying,
    #[serde(rename = "payed")]
    Payed,
    #[serde(rename = "cancelling")]
    Cancelling,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::New,
        OrderStatus::Reserving,
        OrderStatus::AwaitingPayment,
        OrderStatus::Failed,
        OrderStatus::Paying,
        OrderStatus::Payed,
        OrderStatus::Cancelling,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Reserving => "reserving",
            OrderStatus::AwaitingPayment => "awaiting payment",
            OrderStatus::Failed => "failed",
            OrderStatus::Paying => "paying",
            OrderStatus::Payed => "payed",
            OrderStatus::Cancelling => "cancelling",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// True for the in-flight statuses (`reserving`, `paying`, `cancelling`).
    pub const fn is_transitional(&self) -> bool {
        matches!(
            self,
            OrderStatus::Reserving | OrderStatus::Paying | OrderStatus::Cancelling
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// One line of an order: a SKU and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: Sku,
    pub count: u32,
}

impl OrderItem {
    pub fn new(sku: Sku, count: u32) -> Self {
        Self { sku, count }
    }
}

/// Rejections raised before any ledger is touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("user id must be greater than 0, having: {0}")]
    InvalidUserId(UserId),
    #[error("order must contain at least one item")]
    NoItems,
    #[error("sku must be greater than 0, having: {0}")]
    InvalidSku(Sku),
    #[error("item count must be greater than 0, sku: {sku}")]
    InvalidCount { sku: Sku },
}

/// Merging duplicate lines pushed a count past `u32::MAX`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("order item sku: {sku}, total: {total} overflows the item count")]
pub struct ItemOverflow {
    pub sku: Sku,
    pub total: u64,
}

/// Payload for creating a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
}

impl CreateOrder {
    pub fn new(user_id: UserId, items: Vec<OrderItem>) -> Self {
        Self { user_id, items }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id < 1 {
            return Err(ValidationError::InvalidUserId(self.user_id));
        }
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        for item in &self.items {
            if item.sku < 1 {
                return Err(ValidationError::InvalidSku(item.sku));
            }
            if item.count < 1 {
                return Err(ValidationError::InvalidCount { sku: item.sku });
            }
        }
        Ok(())
    }

    /// Items with duplicate SKUs summed, sorted by SKU ascending.
    pub fn merged_items(&self) -> Result<Vec<OrderItem>, ItemOverflow> {
        let mut merged: BTreeMap<Sku, u64> = BTreeMap::new();
        for item in &self.items {
            *merged.entry(item.sku).or_default() += u64::from(item.count);
        }
        merged
            .into_iter()
            .map(|(sku, total)| {
                u32::try_from(total)
                    .map(|count| OrderItem::new(sku, count))
                    .map_err(|_| ItemOverflow { sku, total })
            })
            .collect()
    }
}

/// An order as stored by the order ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn new(id: OrderId, user_id: UserId, status: OrderStatus, items: Vec<OrderItem>) -> Self {
        let mut order = Self {
            id,
            user_id,
            status,
            items,
        };
        order.sort_items();
        order
    }

    /// Client-facing responses list items by SKU ascending.
    pub fn sort_items(&mut self) {
        self.items.sort_by_key(|item| item.sku);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_string() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn only_ing_statuses_are_transitional() {
        let transitional: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_transitional)
            .collect();
        assert_eq!(
            transitional,
            vec![
                OrderStatus::Reserving,
                OrderStatus::Paying,
                OrderStatus::Cancelling
            ]
        );
    }

    #[test]
    fn validate_rejects_malformed_orders() {
        assert_eq!(
            CreateOrder::new(0, vec![OrderItem::new(1, 1)]).validate(),
            Err(ValidationError::InvalidUserId(0))
        );
        assert_eq!(
            CreateOrder::new(1, vec![]).validate(),
            Err(ValidationError::NoItems)
        );
        assert_eq!(
            CreateOrder::new(1, vec![OrderItem::new(-4, 1)]).validate(),
            Err(ValidationError::InvalidSku(-4))
        );
        assert_eq!(
            CreateOrder::new(1, vec![OrderItem::new(3, 0)]).validate(),
            Err(ValidationError::InvalidCount { sku: 3 })
        );
        assert!(CreateOrder::new(1, vec![OrderItem::new(3, 2)]).validate().is_ok());
    }

    #[test]
    fn merged_items_sums_duplicates_and_sorts() {
        let order = CreateOrder::new(
            1,
            vec![
                OrderItem::new(30, 1),
                OrderItem::new(10, 2),
                OrderItem::new(30, 4),
            ],
        );
        assert_eq!(
            order.merged_items().unwrap(),
            vec![OrderItem::new(10, 2), OrderItem::new(30, 5)]
        );
    }

    #[test]
    fn merged_items_reports_overflow() {
        let order = CreateOrder::new(
            1,
            vec![OrderItem::new(5, u32::MAX), OrderItem::new(5, 1)],
        );
        assert_eq!(
            order.merged_items(),
            Err(ItemOverflow {
                sku: 5,
                total: u64::from(u32::MAX) + 1
            })
        );
    }
}
