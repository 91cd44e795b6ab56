//! Runtime orchestration and lifecycle management.
//!
//! - [`LomsSystem`] wires ledgers, services and the outbox publisher, and shuts them down
//! - [`setup_tracing`] initializes the tracing/logging infrastructure

pub mod loms_system;
pub mod tracing;

pub use loms_system::*;
pub use tracing::*;
