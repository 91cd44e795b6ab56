use super::Sku;
use serde::{Deserialize, Serialize};

/// Seed data bundled with the service, used when no seed file is configured.
pub const DEFAULT_STOCK_SEED: &str = include_str!("../../data/stock-data.json");

/// Inventory counters for one SKU.
///
/// `reserved` is held for unpaid orders; `total_count - reserved` is what can
/// still be sold. The ledgers keep `reserved <= total_count` at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub sku: Sku,
    pub total_count: u32,
    pub reserved: u32,
}

impl Stock {
    pub fn new(sku: Sku, total_count: u32, reserved: u32) -> Self {
        Self {
            sku,
            total_count,
            reserved,
        }
    }

    pub fn available(&self) -> u32 {
        self.total_count.saturating_sub(self.reserved)
    }

    /// Parse a JSON array of `{sku, total_count, reserved}` records.
    pub fn parse_seed(json: &str) -> Result<Vec<Stock>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_seed_parses() {
        let stocks = Stock::parse_seed(DEFAULT_STOCK_SEED).unwrap();
        assert!(!stocks.is_empty());
        assert!(stocks.iter().all(|s| s.reserved <= s.total_count));
    }

    #[test]
    fn available_is_total_minus_reserved() {
        assert_eq!(Stock::new(1, 10, 4).available(), 6);
    }
}
