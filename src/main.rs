//! Demo entry point.
//!
//! Loads the config (first argument, default `config/loms.yaml`), starts the
//! service on an in-process broker, walks a few orders through their
//! lifecycle, and shuts down.

use loms::clients::OutboxStore;
use loms::config::LomsConfig;
use loms::lifecycle::{setup_tracing, LomsSystem};
use loms::model::{CreateOrder, OrderItem, OutboxStatus};
use loms::notifier::MemoryBroker;
use tracing::{info, warn, Instrument};

const DEFAULT_CONFIG: &str = "config/loms.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = LomsConfig::load(&path)?;
    info!(path = %path, in_memory = config.service.in_memory, "Config loaded");

    let broker = MemoryBroker::new();
    let system = if config.service.in_memory {
        LomsSystem::in_memory(&config, &broker).await?
    } else {
        LomsSystem::postgres(&config, &broker).await?
    };

    let sku = 1076963;
    let available = system.stock_service.stocks_info(sku).await?;
    info!(sku, available, "Stock before");

    // Paid order
    let paid = async {
        let order_id = system
            .order_service
            .create_order(CreateOrder::new(1, vec![OrderItem::new(sku, 3)]))
            .await?;
        system.order_service.pay_order(order_id).await?;
        Ok::<_, loms::error::LomsError>(order_id)
    }
    .instrument(tracing::info_span!("paid_order"))
    .await?;

    // Cancelled order
    let cancelled = async {
        let order_id = system
            .order_service
            .create_order(CreateOrder::new(2, vec![OrderItem::new(sku, 2)]))
            .await?;
        system.order_service.cancel_order(order_id).await?;
        Ok::<_, loms::error::LomsError>(order_id)
    }
    .instrument(tracing::info_span!("cancelled_order"))
    .await?;

    // More units than exist: the order ends up failed
    let oversized = CreateOrder::new(3, vec![OrderItem::new(sku, 1_000_000)]);
    if let Err(e) = system.order_service.create_order(oversized).await {
        warn!(error = %e, code = ?e.code(), "Order rejected");
    }

    for order_id in [paid, cancelled] {
        let order = system.order_service.order_info(order_id).await?;
        info!(order_id, status = %order.status, "Order state");
    }
    let available = system.stock_service.stocks_info(sku).await?;
    info!(sku, available, "Stock after");

    // Let the publisher drain before stopping.
    tokio::time::sleep(config.broker.poll_interval() * 2).await;
    let rows = system.outbox.entries().await?;
    let unsent = rows
        .iter()
        .filter(|row| row.status != OutboxStatus::Sent)
        .count();
    info!(rows = rows.len(), unsent, "Outbox state");
    system.shutdown().await?;

    for message in broker.delivered().await {
        info!(
            topic = %message.topic,
            key = %message.key,
            payload = %String::from_utf8_lossy(&message.payload),
            "Delivered"
        );
    }
    Ok(())
}
