//! Error types for the stock ledger.

use crate::framework::FrameworkError;
use crate::model::Sku;
use thiserror::Error;

/// Errors that can occur during stock operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    /// The SKU is not known to the ledger.
    #[error("stock not found, sku: {sku}")]
    NotFound { sku: Sku },

    /// Applying `change` would break `0 <= reserved <= total_count`.
    #[error("charging {change} stocks for sku {sku} overflows. reserved: {reserved}, total: {total_count}")]
    OutOfBounds {
        sku: Sku,
        reserved: u32,
        total_count: u32,
        change: u64,
    },

    /// Seed data violates the ledger invariant.
    #[error("invalid seed record for sku {sku}: reserved {reserved} exceeds total {total_count}")]
    InvalidSeed {
        sku: Sku,
        reserved: u32,
        total_count: u32,
    },

    /// The seed lists the same SKU more than once.
    #[error("duplicate seed record for sku {sku}")]
    DuplicateSeed { sku: Sku },

    /// An underlying database error occurred.
    #[error("stock storage error: {0}")]
    Storage(String),

    /// An error occurred while communicating with the stock actor.
    #[error("stock actor communication error: {0}")]
    Actor(#[from] FrameworkError),
}
