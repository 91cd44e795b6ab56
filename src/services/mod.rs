//! Request-facing operations, written against the ledger traits.

pub mod order_service;
pub mod stock_service;

pub use order_service::OrderService;
pub use stock_service::StockService;
