// src/schedule/state.rs

//! Per-connector runtime state.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ConnectorSpec;
use crate::engine::ConnectorName;

/// Mutable state of one schedulable connector, owned by the [`Scheduler`].
///
/// [`Scheduler`]: crate::schedule::Scheduler
#[derive(Debug, Clone)]
pub struct ConnectorRuntimeState {
    pub spec: Arc<ConnectorSpec>,

    /// When the last run was collected (or the last launch attempt was
    /// given up). `None` until then.
    pub last_sync: Option<Instant>,

    /// A launched process has not been collected yet.
    pub in_flight: bool,

    /// Number of collected runs.
    pub runs: u64,
}

impl ConnectorRuntimeState {
    pub fn new(spec: Arc<ConnectorSpec>) -> Self {
        Self {
            spec,
            last_sync: None,
            in_flight: false,
            runs: 0,
        }
    }

    pub fn name(&self) -> &ConnectorName {
        &self.spec.name
    }

    /// Whether the run interval has elapsed since `last_sync`.
    ///
    /// Ignores `in_flight`; see [`ConnectorRuntimeState::is_due`].
    pub fn interval_elapsed(&self, now: Instant) -> bool {
        match self.last_sync {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.spec.run_interval,
        }
    }

    /// Eligible for dispatch at `now`: idle and interval elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        !self.in_flight && self.interval_elapsed(now)
    }
}

/// Public, read-only snapshot of a connector's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorPhase {
    /// Never ran (or attempted to run) yet.
    Pending,
    /// A process is running for this connector.
    InFlight,
    /// Waiting for its interval to elapse again.
    Idle,
}

impl From<&ConnectorRuntimeState> for ConnectorPhase {
    fn from(state: &ConnectorRuntimeState) -> Self {
        if state.in_flight {
            ConnectorPhase::InFlight
        } else if state.last_sync.is_none() {
            ConnectorPhase::Pending
        } else {
            ConnectorPhase::Idle
        }
    }
}
