use loms::clients::{OrderClient, OrderLedger, OutboxClient, OutboxStore, StockClient, StockLedger};
use loms::error::{ErrorCode, LomsError};
use loms::framework::mock::MockClient;
use loms::model::{CreateOrder, OrderItem, OrderStatus, Stock};
use loms::order_actor::OrderError;
use loms::services::OrderService;
use loms::stock_actor::{StockBook, StockError};
use loms::telemetry::NoopTelemetry;
use std::sync::Arc;

struct Harness {
    service: OrderService,
    orders: OrderClient,
    stocks: StockClient,
    outbox: OutboxClient,
}

/// Real stock and order actors, seeded with SKU 1 (10 units) and SKU 2 (5 units).
fn harness() -> Harness {
    let (stock_actor, stocks) =
        loms::stock_actor::new(16, vec![Stock::new(1, 10, 0), Stock::new(2, 5, 0)])
            .expect("valid seed");
    let (order_actor, orders, outbox) = loms::order_actor::new(16, "loms.order-events");
    tokio::spawn(stock_actor.run());
    tokio::spawn(order_actor.run());

    let service = OrderService::new(
        Arc::new(orders.clone()),
        Arc::new(stocks.clone()),
        Arc::new(NoopTelemetry),
    );
    Harness {
        service,
        orders,
        stocks,
        outbox,
    }
}

async fn announced(outbox: &OutboxClient) -> Vec<(Option<OrderStatus>, OrderStatus)> {
    outbox
        .entries()
        .await
        .expect("outbox readable")
        .iter()
        .map(|entry| {
            let message = entry.decode().expect("valid payload");
            (message.from_status, message.to_status)
        })
        .collect()
}

/// A reservation that can't be satisfied leaves the order `failed` and stock untouched.
#[tokio::test]
async fn failed_reservation_marks_order_failed() {
    let h = harness();

    let err = h
        .service
        .create_order(CreateOrder::new(1, vec![OrderItem::new(1, 11)]))
        .await
        .expect_err("not enough stock");
    let LomsError::ReservedStockFailed { order_id, source } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert!(matches!(source, StockError::OutOfBounds { sku: 1, .. }));
    assert_eq!(err.code(), ErrorCode::FailedPrecondition);

    let order = h.service.order_info(*order_id).await.expect("order exists");
    assert_eq!(order.status, OrderStatus::Failed);
    assert_eq!(h.stocks.stock(1).await.unwrap(), Stock::new(1, 10, 0));

    assert_eq!(
        announced(&h.outbox).await,
        vec![
            (None, OrderStatus::New),
            (Some(OrderStatus::New), OrderStatus::Failed)
        ]
    );
}

/// Reservation failure is surfaced even when the SKU is unknown, and no other SKU moves.
#[tokio::test]
async fn unknown_sku_fails_the_whole_order() {
    let h = harness();

    let err = h
        .service
        .create_order(CreateOrder::new(
            1,
            vec![OrderItem::new(1, 2), OrderItem::new(404, 1)],
        ))
        .await
        .expect_err("unknown sku");
    assert!(matches!(
        err,
        LomsError::ReservedStockFailed {
            source: StockError::NotFound { sku: 404 },
            ..
        }
    ));
    assert_eq!(h.stocks.available(1).await.unwrap(), 10);
}

/// Create then pay: stock leaves both counters, and paying twice is a no-op.
#[tokio::test]
async fn pay_settles_reserved_stock_and_is_idempotent() {
    let h = harness();

    let order_id = h
        .service
        .create_order(CreateOrder::new(
            7,
            vec![OrderItem::new(1, 3), OrderItem::new(2, 2)],
        ))
        .await
        .expect("order created");
    assert_eq!(
        h.service.order_info(order_id).await.unwrap().status,
        OrderStatus::AwaitingPayment
    );
    assert_eq!(h.stocks.stock(1).await.unwrap(), Stock::new(1, 10, 3));

    h.service.pay_order(order_id).await.expect("paid");
    assert_eq!(
        h.service.order_info(order_id).await.unwrap().status,
        OrderStatus::Payed
    );
    assert_eq!(h.stocks.stock(1).await.unwrap(), Stock::new(1, 7, 0));
    assert_eq!(h.stocks.stock(2).await.unwrap(), Stock::new(2, 3, 0));

    h.service.pay_order(order_id).await.expect("second pay is a no-op");
    assert_eq!(h.stocks.stock(1).await.unwrap(), Stock::new(1, 7, 0));

    assert_eq!(
        announced(&h.outbox).await,
        vec![
            (None, OrderStatus::New),
            (Some(OrderStatus::New), OrderStatus::AwaitingPayment),
            (Some(OrderStatus::AwaitingPayment), OrderStatus::Payed),
        ]
    );
}

/// Cancel releases the reservation; cancelling again is a no-op.
#[tokio::test]
async fn cancel_releases_reservation_and_is_idempotent() {
    let h = harness();

    let order_id = h
        .service
        .create_order(CreateOrder::new(7, vec![OrderItem::new(2, 4)]))
        .await
        .expect("order created");
    assert_eq!(h.stocks.available(2).await.unwrap(), 1);

    h.service.cancel_order(order_id).await.expect("cancelled");
    h.service
        .cancel_order(order_id)
        .await
        .expect("second cancel is a no-op");

    assert_eq!(
        h.service.order_info(order_id).await.unwrap().status,
        OrderStatus::Cancelled
    );
    assert_eq!(h.stocks.stock(2).await.unwrap(), Stock::new(2, 5, 0));
}

/// Terminal orders can't be moved into the other terminal state.
#[tokio::test]
async fn terminal_orders_reject_the_opposite_transition() {
    let h = harness();
    let order_id = h
        .service
        .create_order(CreateOrder::new(1, vec![OrderItem::new(1, 1)]))
        .await
        .unwrap();
    h.service.pay_order(order_id).await.unwrap();

    let err = h.service.cancel_order(order_id).await.unwrap_err();
    assert_eq!(
        err,
        LomsError::InvalidOrderStatus {
            order_id,
            status: OrderStatus::Payed
        }
    );
    assert_eq!(err.code(), ErrorCode::FailedPrecondition);
}

/// An order parked in an "-ing" status is caught by the status compare-and-swap.
#[tokio::test]
async fn in_flight_order_is_rejected_by_the_cas() {
    let h = harness();
    let order_id = h
        .service
        .create_order(CreateOrder::new(1, vec![OrderItem::new(1, 1)]))
        .await
        .unwrap();
    h.orders
        .update_status(order_id, OrderStatus::Paying, OrderStatus::AwaitingPayment)
        .await
        .unwrap();

    let err = h.service.cancel_order(order_id).await.unwrap_err();
    assert_eq!(
        err,
        LomsError::Order(OrderError::StatusMismatch {
            order_id,
            current: OrderStatus::Paying,
            expected: OrderStatus::AwaitingPayment
        })
    );
    assert_eq!(h.stocks.stock(1).await.unwrap(), Stock::new(1, 10, 1));
}

#[tokio::test]
async fn order_info_lists_items_by_sku() {
    let h = harness();
    let order_id = h
        .service
        .create_order(CreateOrder::new(
            1,
            vec![
                OrderItem::new(2, 1),
                OrderItem::new(1, 1),
                OrderItem::new(2, 1),
            ],
        ))
        .await
        .unwrap();

    let order = h.service.order_info(order_id).await.unwrap();
    assert_eq!(order.items, vec![OrderItem::new(1, 1), OrderItem::new(2, 2)]);
    assert_eq!(h.stocks.stock(2).await.unwrap().reserved, 2);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let h = harness();
    let err = h.service.pay_order(42).await.unwrap_err();
    assert_eq!(err, LomsError::Order(OrderError::NotFound { order_id: 42 }));
    assert_eq!(err.code(), ErrorCode::NotFound);
}

/// A failing stock settlement rolls the order back to `awaiting payment`.
#[tokio::test]
async fn failed_settlement_rolls_back_to_awaiting_payment() {
    let (order_actor, orders, outbox) = loms::order_actor::new(16, "loms.order-events");
    tokio::spawn(order_actor.run());

    let stock_mock = MockClient::<StockBook>::new();
    stock_mock
        .expect_call()
        .return_ok(loms::stock_actor::StockReply::Reserved);
    stock_mock
        .expect_call()
        .return_err(StockError::Storage("disk full".into()));

    let service = OrderService::new(
        Arc::new(orders.clone()),
        Arc::new(StockClient::new(stock_mock.client())),
        Arc::new(NoopTelemetry),
    );

    let order_id = service
        .create_order(CreateOrder::new(3, vec![OrderItem::new(9, 1)]))
        .await
        .unwrap();
    let err = service.pay_order(order_id).await.unwrap_err();
    assert_eq!(err, LomsError::Stock(StockError::Storage("disk full".into())));
    assert_eq!(err.code(), ErrorCode::Internal);
    stock_mock.verify();

    let order = orders.get_by_id(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::AwaitingPayment);
    // The rollback is not announced: consumers still see `awaiting payment`.
    assert_eq!(announced(&outbox).await.len(), 2);
}
