//! # LOMS
//!
//! > **Order and inventory management behind an e-commerce checkout.**
//!
//! The service creates orders, reserves and releases stock, moves orders
//! through their payment lifecycle, and announces every externally visible
//! status change through a transactional outbox.
//!
//! ## Architecture Notes
//!
//! ### 1. Two ledgers, one state machine
//! The [stock ledger](stock_actor) never lets `reserved` exceed
//! `total_count`; every batch is applied whole or not at all. The
//! [order ledger](order_actor) only changes a status through a
//! compare-and-swap. [`OrderService`](services::OrderService) chains the two:
//! mark the order "-ing", run the stock batch, mark it done, and roll back if
//! the stock batch fails.
//!
//! ### 2. Outbox
//! The row announcing a status change is written by the same command (or the
//! same transaction, on Postgres) as the status itself.
//! [`OutboxPublisher`](notifier::OutboxPublisher) drains it on a timer.
//!
//! ### 3. Concurrency Model
//! In memory, each ledger is a [`ResourceActor`](framework::ResourceActor) that
//! applies one command at a time. Commands are applied synchronously, so a
//! caller that gives up mid-request never leaves a ledger half-updated. On
//! Postgres the same guarantees come from one transaction per operation.
//!
//! ### 4. Observability
//! `tracing` everywhere with structured fields; see [`lifecycle::tracing`].
//! Request timings go through the injected [`telemetry::Telemetry`] seam.
//!
//! ## Module Tour
//!
//! - [`framework`]: generic actor, client and mocks
//! - [`model`]: orders, stock records, outbox rows
//! - [`stock_actor`], [`order_actor`]: in-memory ledgers
//! - [`postgres`]: the same ledgers on sqlx
//! - [`clients`]: ledger traits and their actor-backed clients
//! - [`services`]: the order state machine and stock queries
//! - [`notifier`]: broker seam and outbox publisher
//! - [`config`], [`lifecycle`]: configuration and wiring
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run -- config/loms.yaml
//! ```

pub mod clients;
pub mod config;
pub mod error;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod notifier;
pub mod order_actor;
pub mod postgres;
pub mod services;
pub mod stock_actor;
pub mod telemetry;
