use crate::clients::{OrderLedger, OutboxStore, StockLedger};
use crate::config::{ConfigError, LomsConfig};
use crate::notifier::{connect_with_retry, BrokerConnector, BrokerError, OutboxPublisher};
use crate::postgres::{self, PgOrderLedger, PgOutboxStore, PgStockLedger};
use crate::services::{OrderService, StockService};
use crate::stock_actor::StockError;
use crate::telemetry::{Telemetry, TracingTelemetry};
use crate::{order_actor, stock_actor};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const ACTOR_BUFFER: usize = 64;

/// Failures while starting or stopping the service.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("stock seed rejected: {0}")]
    Seed(#[from] StockError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("task failed: {0}")]
    Task(String),
}

/// The storage a [`LomsSystem`] runs on.
pub struct Ledgers {
    pub stocks: Arc<dyn StockLedger>,
    pub orders: Arc<dyn OrderLedger>,
    pub outbox: Arc<dyn OutboxStore>,
}

/// The running service: ledgers, request services, and the outbox publisher.
///
/// # Example
///
/// ```ignore
/// let broker = MemoryBroker::new();
/// let system = LomsSystem::in_memory(&LomsConfig::default(), &broker).await?;
///
/// let order_id = system.order_service.create_order(params).await?;
/// system.order_service.pay_order(order_id).await?;
///
/// system.shutdown().await?;
/// ```
pub struct LomsSystem {
    pub order_service: OrderService,
    pub stock_service: StockService,
    /// Notification rows, for inspecting what the publisher has sent.
    pub outbox: Arc<dyn OutboxStore>,
    shutdown: CancellationToken,
    publisher: JoinHandle<()>,
    actors: Vec<JoinHandle<()>>,
}

impl LomsSystem {
    /// Runs on the stock and order actors.
    pub async fn in_memory(
        config: &LomsConfig,
        connector: &dyn BrokerConnector,
    ) -> Result<Self, SystemError> {
        let seed = config.stock.load_seed()?;
        let (stock_actor, stocks) = stock_actor::new(ACTOR_BUFFER, seed)?;
        let (order_actor, orders, outbox) =
            order_actor::new(ACTOR_BUFFER, config.broker.order_topic.clone());

        let actors = vec![
            tokio::spawn(stock_actor.run()),
            tokio::spawn(order_actor.run()),
        ];
        let ledgers = Ledgers {
            stocks: Arc::new(stocks),
            orders: Arc::new(orders),
            outbox: Arc::new(outbox),
        };
        Self::start(config, connector, ledgers, actors).await
    }

    /// Runs on Postgres: connects, creates the schema, and seeds stocks.
    pub async fn postgres(
        config: &LomsConfig,
        connector: &dyn BrokerConnector,
    ) -> Result<Self, SystemError> {
        let url = config.database.url.as_deref().ok_or_else(|| {
            ConfigError::Invalid("database.url is required for the postgres backend".into())
        })?;
        let pool = postgres::connect(url, config.database.max_connections).await?;
        postgres::migrate(&pool).await?;
        postgres::seed_stocks(&pool, &config.stock.load_seed()?).await?;

        let ledgers = Ledgers {
            stocks: Arc::new(PgStockLedger::new(pool.clone())),
            orders: Arc::new(PgOrderLedger::new(
                pool.clone(),
                config.broker.order_topic.clone(),
            )),
            outbox: Arc::new(PgOutboxStore::new(pool)),
        };
        Self::start(config, connector, ledgers, Vec::new()).await
    }

    /// Connects the broker, builds the services and spawns the publisher.
    ///
    /// `actors` are tasks that end once every ledger handle is dropped; they
    /// are awaited by [`shutdown`](Self::shutdown).
    pub async fn start(
        config: &LomsConfig,
        connector: &dyn BrokerConnector,
        ledgers: Ledgers,
        actors: Vec<JoinHandle<()>>,
    ) -> Result<Self, SystemError> {
        let shutdown = CancellationToken::new();
        let broker =
            connect_with_retry(connector, &config.broker.retry_policy(), &shutdown).await?;

        let Ledgers {
            stocks,
            orders,
            outbox,
        } = ledgers;
        let telemetry: Arc<dyn Telemetry> = Arc::new(TracingTelemetry);
        let order_service = OrderService::new(orders, stocks.clone(), telemetry.clone());
        let stock_service = StockService::new(stocks, telemetry);

        let publisher = OutboxPublisher::new(
            outbox.clone(),
            broker,
            config.broker.batch_size,
            config.broker.poll_interval(),
        );
        let publisher = tokio::spawn(publisher.run(shutdown.clone()));
        info!(topic = %config.broker.order_topic, "LOMS started");

        Ok(Self {
            order_service,
            stock_service,
            outbox,
            shutdown,
            publisher,
            actors,
        })
    }

    /// Stops the publisher, closes every ledger handle, and waits for all tasks.
    ///
    /// Clones of the services or ledgers taken from this system must be
    /// dropped first, or the actors will keep running.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");
        let LomsSystem {
            order_service,
            stock_service,
            outbox,
            shutdown,
            publisher,
            actors,
        } = self;

        // The publisher finishes its current batch before it sees the cancellation.
        shutdown.cancel();
        publisher.await.map_err(|e| {
            error!("Publisher task failed: {:?}", e);
            SystemError::Task(e.to_string())
        })?;

        drop(order_service);
        drop(stock_service);
        drop(outbox);

        for handle in actors {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(SystemError::Task(e.to_string()));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
