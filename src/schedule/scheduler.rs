use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{ConfigFile, ConnectorSpec};
use crate::engine::ConnectorName;
use crate::outcome::Outcome;
use crate::schedule::state::{ConnectorPhase, ConnectorRuntimeState};

/// Result of recording a collected run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionStep {
    /// The connector was dropped from the schedule for good.
    pub removed: bool,
    /// 1-based number of this run for the connector.
    pub run_number: u64,
}

/// Scheduler holds the runtime state of every schedulable connector.
///
/// It is purely synchronous and never touches processes or files; the
/// caller passes `now` explicitly. It is responsible for:
/// - excluding connectors whose spec lacks a script path or params
/// - deciding which connectors are due (`last_sync` + `run_interval`)
/// - guaranteeing at most one in-flight run per connector
/// - advancing `last_sync` and removing connectors after unrecoverable runs
#[derive(Debug)]
pub struct Scheduler {
    /// Schedulable connectors in configuration order.
    connectors: Vec<ConnectorRuntimeState>,
    /// Connectors that were never schedulable.
    excluded: Vec<ConnectorName>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(cfg.connectors.iter().cloned())
    }

    /// Construct a scheduler from connector specs, in iteration order.
    ///
    /// Specs lacking a script path or params are logged once here and never
    /// take part in any dispatch decision.
    pub fn new(specs: impl IntoIterator<Item = ConnectorSpec>) -> Self {
        let mut connectors = Vec::new();
        let mut excluded = Vec::new();

        for spec in specs {
            if spec.is_schedulable() {
                debug!(
                    connector = %spec.name,
                    interval_secs = spec.run_interval.as_secs(),
                    "connector registered"
                );
                connectors.push(ConnectorRuntimeState::new(Arc::new(spec)));
            } else {
                warn!(
                    connector = %spec.name,
                    "mandatory params (connector params/script file path) are missing; connector can't be scheduled to run"
                );
                excluded.push(spec.name);
            }
        }

        Self {
            connectors,
            excluded,
        }
    }

    /// Number of connectors still schedulable.
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn contains(&self, connector: &str) -> bool {
        self.state_of(connector).is_some()
    }

    /// Names of connectors excluded at construction time.
    pub fn excluded(&self) -> &[ConnectorName] {
        &self.excluded
    }

    /// Names of schedulable connectors, in configuration order.
    pub fn connector_names(&self) -> impl Iterator<Item = &str> {
        self.connectors.iter().map(|s| s.name().as_str())
    }

    pub fn state_of(&self, connector: &str) -> Option<&ConnectorRuntimeState> {
        self.connectors.iter().find(|s| s.name() == connector)
    }

    pub fn phase_of(&self, connector: &str) -> Option<ConnectorPhase> {
        self.state_of(connector).map(ConnectorPhase::from)
    }

    pub fn spec_of(&self, connector: &str) -> Option<Arc<ConnectorSpec>> {
        self.state_of(connector).map(|s| Arc::clone(&s.spec))
    }

    pub fn in_flight_count(&self) -> usize {
        self.connectors.iter().filter(|s| s.in_flight).count()
    }

    /// Every remaining connector has run (or given up a launch) at least
    /// once and nothing is in flight.
    pub fn all_synced(&self) -> bool {
        self.connectors
            .iter()
            .all(|s| !s.in_flight && s.last_sync.is_some())
    }

    /// Connectors eligible for dispatch at `now`, in configuration order.
    pub fn due_connectors(&self, now: Instant) -> Vec<ConnectorName> {
        self.connectors
            .iter()
            .filter(|s| s.is_due(now))
            .map(|s| s.name().clone())
            .collect()
    }

    /// Mark a connector as having a live process.
    ///
    /// Returns `false` (and changes nothing) if the connector is unknown or
    /// already in flight.
    pub fn mark_in_flight(&mut self, connector: &str) -> bool {
        match self.state_mut(connector) {
            Some(state) if !state.in_flight => {
                state.in_flight = true;
                true
            }
            Some(_) => {
                warn!(connector = %connector, "connector already in flight; refusing second launch");
                false
            }
            None => {
                warn!(connector = %connector, "launch for unknown connector; ignoring");
                false
            }
        }
    }

    /// Push the connector's next eligibility one interval into the future
    /// without recording a run. Used when a launch could not happen.
    pub fn defer(&mut self, connector: &str, now: Instant) {
        if let Some(state) = self.state_mut(connector) {
            state.last_sync = Some(now);
            state.in_flight = false;
            debug!(connector = %connector, "connector deferred until its next interval");
        }
    }

    /// Record a collected run: advance `last_sync`, clear `in_flight`, and
    /// drop the connector if the outcome is unrecoverable.
    ///
    /// Returns `None` for unknown connectors.
    pub fn record_completion(
        &mut self,
        connector: &str,
        outcome: &Outcome,
        now: Instant,
    ) -> Option<CompletionStep> {
        let Some(state) = self.state_mut(connector) else {
            warn!(connector = %connector, "completion for unknown connector; ignoring");
            return None;
        };

        state.last_sync = Some(now);
        state.in_flight = false;
        state.runs += 1;
        let run_number = state.runs;

        let removed = outcome.removes_connector();
        if removed {
            self.connectors.retain(|s| s.name() != connector);
            info!(
                connector = %connector,
                remaining = self.connectors.len(),
                "connector removed from execution list"
            );
        }

        Some(CompletionStep {
            removed,
            run_number,
        })
    }

    fn state_mut(&mut self, connector: &str) -> Option<&mut ConnectorRuntimeState> {
        self.connectors.iter_mut().find(|s| s.name() == connector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::path::PathBuf;
    use std::time::Duration;

    fn spec(name: &str, interval_secs: u64) -> ConnectorSpec {
        ConnectorSpec {
            name: name.to_string(),
            run_interval: Duration::from_secs(interval_secs),
            script_path: Some(PathBuf::from(format!("{name}.sh"))),
            output_dir: PathBuf::from(format!("out/{name}")),
            params: Some(Default::default()),
            interpreter: None,
            timeout: None,
        }
    }

    #[test]
    fn first_tick_makes_everything_due() {
        let sched = Scheduler::new(vec![spec("A", 5), spec("B", 60)]);
        assert_eq!(sched.due_connectors(Instant::now()), vec!["A", "B"]);
    }

    #[test]
    fn unschedulable_specs_are_excluded() {
        let mut no_params = spec("B", 5);
        no_params.params = None;
        let mut no_script = spec("C", 5);
        no_script.script_path = None;

        let sched = Scheduler::new(vec![spec("A", 5), no_params, no_script]);

        assert_eq!(sched.len(), 1);
        assert_eq!(sched.excluded().to_vec(), vec!["B".to_string(), "C".to_string()]);
        assert_eq!(sched.due_connectors(Instant::now()), vec!["A"]);
    }

    #[test]
    fn in_flight_connector_is_never_due_nor_relaunched() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(vec![spec("A", 1)]);

        assert!(sched.mark_in_flight("A"));
        assert!(!sched.mark_in_flight("A"));
        assert!(sched.due_connectors(t0 + Duration::from_secs(3600)).is_empty());
        assert_eq!(sched.phase_of("A"), Some(ConnectorPhase::InFlight));
    }

    #[test]
    fn interval_counts_from_completion() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(vec![spec("A", 5)]);

        sched.mark_in_flight("A");
        let step = sched
            .record_completion("A", &Outcome::Success(Value::Null), t0)
            .unwrap();
        assert_eq!(step, CompletionStep { removed: false, run_number: 1 });

        assert!(sched.due_connectors(t0 + Duration::from_millis(4999)).is_empty());
        assert_eq!(sched.due_connectors(t0 + Duration::from_secs(5)), vec!["A"]);
    }

    #[test]
    fn unrecoverable_outcome_removes_connector() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(vec![spec("A", 1), spec("B", 1)]);
        sched.mark_in_flight("A");

        let step = sched
            .record_completion("A", &Outcome::UnrecoverableFailure("fatal".into()), t0)
            .unwrap();

        assert!(step.removed);
        assert!(!sched.contains("A"));
        assert_eq!(sched.due_connectors(t0 + Duration::from_secs(10)), vec!["B"]);
        assert!(sched.record_completion("A", &Outcome::Success(Value::Null), t0).is_none());
    }

    #[test]
    fn connector_names_follow_configuration_order() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(vec![spec("B", 1), spec("A", 1), spec("C", 1)]);
        assert_eq!(sched.connector_names().collect::<Vec<_>>(), vec!["B", "A", "C"]);

        sched.mark_in_flight("A");
        sched.record_completion("A", &Outcome::UnrecoverableFailure("x".into()), t0);
        assert_eq!(sched.connector_names().collect::<Vec<_>>(), vec!["B", "C"]);
    }

    #[test]
    fn defer_advances_clock_without_counting_a_run() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(vec![spec("A", 5)]);

        sched.defer("A", t0);

        let state = sched.state_of("A").unwrap();
        assert_eq!(state.runs, 0);
        assert_eq!(sched.phase_of("A"), Some(ConnectorPhase::Idle));
        assert!(sched.due_connectors(t0 + Duration::from_secs(1)).is_empty());
        assert!(sched.all_synced());
    }
}
