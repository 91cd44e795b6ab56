//! Request telemetry seam.
//!
//! Services report each operation through a [`Telemetry`] handle they are
//! given at construction. Nothing here is global, and nothing in the order
//! flow depends on what a recorder does.

use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Error,
}

impl Outcome {
    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Outcome::Ok
        } else {
            Outcome::Error
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Error => "error",
        }
    }
}

pub trait Telemetry: Send + Sync {
    fn record(&self, operation: &'static str, outcome: Outcome, elapsed: Duration);
}

/// Emits one debug event per operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(&self, operation: &'static str, outcome: Outcome, elapsed: Duration) {
        debug!(
            operation,
            outcome = outcome.as_str(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Request handled"
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _operation: &'static str, _outcome: Outcome, _elapsed: Duration) {}
}
