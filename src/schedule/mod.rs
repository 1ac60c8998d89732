// src/schedule/mod.rs

//! Connector readiness tracking.
//!
//! - [`state`] holds the mutable per-connector runtime state.
//! - [`scheduler`] owns all states and decides which connectors are due.

pub mod scheduler;
pub mod state;

pub use scheduler::{CompletionStep, Scheduler};
pub use state::{ConnectorPhase, ConnectorRuntimeState};
