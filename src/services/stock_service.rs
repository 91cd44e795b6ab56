use crate::clients::StockLedger;
use crate::error::LomsError;
use crate::model::Sku;
use crate::telemetry::{Outcome, Telemetry};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Read-side stock queries.
#[derive(Clone)]
pub struct StockService {
    stocks: Arc<dyn StockLedger>,
    telemetry: Arc<dyn Telemetry>,
}

impl StockService {
    pub fn new(stocks: Arc<dyn StockLedger>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self { stocks, telemetry }
    }

    /// Units of `sku` that can still be reserved.
    #[instrument(skip(self))]
    pub async fn stocks_info(&self, sku: Sku) -> Result<u32, LomsError> {
        let started = Instant::now();
        let result = if sku < 1 {
            Err(LomsError::InvalidSku { sku })
        } else {
            self.stocks.available(sku).await.map_err(LomsError::from)
        };
        self.telemetry
            .record("stocks_info", Outcome::of(&result), started.elapsed());
        result
    }
}
