// src/engine/mod.rs

//! Orchestration engine for connector-cycle.
//!
//! This module ties together:
//! - the connector [`Scheduler`](crate::schedule::Scheduler)
//! - the in-flight set of launched, not yet collected, runs
//! - the tick loop that, every tick:
//!   - dispatches due connectors through a launch backend ([`dispatch`])
//!   - collects finished runs, classifies them and writes result files
//!     ([`collect`])
//!
//! The loop itself lives in [`runtime`]. It is the only owner of the
//! scheduler state and the in-flight set; workers talk back exclusively
//! through their completion signals.

use std::time::Duration;

/// Canonical connector name type used throughout the engine.
pub type ConnectorName = String;

/// Runtime options for the tick loop.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Pause between two ticks.
    pub tick_interval: Duration,
    /// If true, stop once every connector has completed (or given up) one
    /// run and nothing is in flight (used for `--once`).
    pub exit_when_idle: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(crate::config::model::DEFAULT_TICK_INTERVAL_MS),
            exit_when_idle: false,
        }
    }
}

pub mod collect;
pub mod dispatch;
pub mod in_flight;
pub mod runtime;

pub use collect::CollectedRun;
pub use dispatch::DispatchStatus;
pub use in_flight::InFlightSet;
pub use runtime::{Runtime, TickReport};
