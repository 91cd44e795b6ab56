use loms::clients::OutboxStore;
use loms::config::LomsConfig;
use loms::error::LomsError;
use loms::lifecycle::{LomsSystem, SystemError};
use loms::model::{CreateOrder, OrderItem, OrderStateMessage, OrderStatus, OutboxStatus};
use loms::notifier::{BrokerError, MemoryBroker};
use std::time::Duration;

fn fast_config() -> LomsConfig {
    LomsConfig::from_yaml_str(
        "broker:\n  poll_interval_ms: 10\n  connect_attempts: 3\n  connect_backoff_ms: 1\n  connect_max_backoff_ms: 2\n",
    )
    .expect("valid config")
}

/// Full end-to-end run on the in-memory backend: orders flow through the
/// state machine and their visible transitions reach the broker.
#[tokio::test]
async fn full_order_lifecycle_reaches_the_broker() {
    let broker = MemoryBroker::new();
    broker.fail_next_connects(1);
    let system = LomsSystem::in_memory(&fast_config(), &broker)
        .await
        .expect("system starts");

    // SKU 1076963 is seeded with 400 units, 40 of them reserved.
    let sku = 1076963;
    assert_eq!(system.stock_service.stocks_info(sku).await.unwrap(), 360);

    let paid = system
        .order_service
        .create_order(CreateOrder::new(1, vec![OrderItem::new(sku, 10)]))
        .await
        .expect("order created");
    system.order_service.pay_order(paid).await.expect("paid");

    let cancelled = system
        .order_service
        .create_order(CreateOrder::new(2, vec![OrderItem::new(sku, 5)]))
        .await
        .expect("order created");
    system
        .order_service
        .cancel_order(cancelled)
        .await
        .expect("cancelled");

    let err = system
        .order_service
        .create_order(CreateOrder::new(3, vec![OrderItem::new(sku, 10_000)]))
        .await
        .expect_err("oversized order");
    let failed = match &err {
        LomsError::ReservedStockFailed { order_id, .. } => *order_id,
        other => panic!("unexpected error: {other:?}"),
    };

    assert_eq!(system.stock_service.stocks_info(sku).await.unwrap(), 350);
    assert_eq!(
        system.order_service.order_info(paid).await.unwrap().status,
        OrderStatus::Payed
    );

    // paid and cancelled announce three statuses each, failed announces two
    for _ in 0..200 {
        if broker.delivered().await.len() == 8 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let rows = system.outbox.entries().await.expect("outbox readable");
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|row| row.status == OutboxStatus::Sent));
    system.shutdown().await.expect("clean shutdown");

    let messages: Vec<OrderStateMessage> = broker
        .delivered()
        .await
        .iter()
        .map(|m| serde_json::from_slice(&m.payload).expect("valid payload"))
        .collect();
    let for_order = |order_id| -> Vec<OrderStatus> {
        messages
            .iter()
            .filter(|m| m.order_id == order_id)
            .map(|m| m.to_status)
            .collect()
    };
    assert_eq!(
        for_order(paid),
        vec![OrderStatus::New, OrderStatus::AwaitingPayment, OrderStatus::Payed]
    );
    assert_eq!(
        for_order(cancelled),
        vec![OrderStatus::New, OrderStatus::AwaitingPayment, OrderStatus::Cancelled]
    );
    assert_eq!(for_order(failed), vec![OrderStatus::New, OrderStatus::Failed]);
}

/// An unreachable broker is fatal at startup.
#[tokio::test]
async fn startup_fails_when_broker_stays_down() {
    let broker = MemoryBroker::new();
    broker.fail_next_connects(10);

    let result = LomsSystem::in_memory(&fast_config(), &broker).await;
    assert!(matches!(
        result,
        Err(SystemError::Broker(BrokerError::RetriesExhausted { attempts: 3, .. }))
    ));
}

#[test]
fn bundled_config_file_is_valid() {
    let config = LomsConfig::load("config/loms.yaml").expect("config/loms.yaml loads");
    assert!(config.service.in_memory);
    assert_eq!(config.broker.batch_size, 10);
}
