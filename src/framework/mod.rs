//! Generic actor framework for in-memory stores.
//!
//! This module provides the building blocks the ledgers run on: a store that
//! applies commands one at a time inside its own Tokio task.
//!
//! # Main Components
//!
//! - [`ActorState`] - Trait that stores implement to be managed by an actor
//! - [`ResourceActor`] - Generic actor that owns a store
//! - [`ResourceClient`] - Cloneable handle for sending commands
//! - [`FrameworkError`] - Common channel errors
//!
//! # Testing
//!
//! See [`mock`] module for utilities to test clients without spawning full actors.

pub mod core;
pub mod mock;

// Re-export core types for convenience
pub use self::core::*;
