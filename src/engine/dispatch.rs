// src/engine/dispatch.rs

//! Dispatch phase: launch every connector that is due.

use std::time::Instant;

use tracing::{debug, warn};

use crate::config::ConnectorSpec;
use crate::engine::in_flight::InFlightSet;
use crate::engine::ConnectorName;
use crate::errors::{CycleError, Result};
use crate::exec::{InFlightWork, Launch, LaunchBackend, LaunchRequest};
use crate::fs::FileSystem;
use crate::schedule::Scheduler;

/// What happened to one due connector during a dispatch phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// A process was started and is now in flight.
    Launched,
    /// The script path does not name a file; retried after one interval.
    ScriptMissing,
    /// Script path or params missing; retried after one interval.
    MissingMandatory,
    /// No free worker slot; retried on the next tick.
    PoolSaturated,
    /// Any other error (output dir, spawn, serialization); retried after
    /// one interval.
    Failed,
}

/// Dispatch every due connector, in configuration order.
///
/// Each connector is handled in isolation: whatever happens to one of them
/// only changes that connector's state.
pub fn dispatch_due<L: LaunchBackend>(
    scheduler: &mut Scheduler,
    launcher: &mut L,
    in_flight: &mut InFlightSet,
    fs: &dyn FileSystem,
    now: Instant,
) -> Vec<(ConnectorName, DispatchStatus)> {
    let mut statuses = Vec::new();

    for name in scheduler.due_connectors(now) {
        if in_flight.contains(&name) {
            continue;
        }
        let Some(spec) = scheduler.spec_of(&name) else {
            continue;
        };

        let status = match try_launch(&spec, launcher, fs) {
            Ok(Attempt::Started(work)) => register_started(scheduler, in_flight, work),
            Ok(Attempt::ScriptMissing) => {
                warn!(
                    connector = %name,
                    script = %spec
                        .script_path
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    "can't start connector; script file path is not a valid file path"
                );
                scheduler.defer(&name, now);
                DispatchStatus::ScriptMissing
            }
            Ok(Attempt::MissingMandatory) => {
                warn!(
                    connector = %name,
                    "mandatory params (connector params/script file path) are missing; skipping this interval"
                );
                scheduler.defer(&name, now);
                DispatchStatus::MissingMandatory
            }
            Ok(Attempt::PoolSaturated) => DispatchStatus::PoolSaturated,
            Err(err) => {
                warn!(connector = %name, error = %err, "error while dispatching connector");
                scheduler.defer(&name, now);
                DispatchStatus::Failed
            }
        };

        debug!(connector = %name, ?status, "dispatch decision");
        statuses.push((name, status));
    }

    statuses
}

/// Flag the connector and track its run. Either side refusing means the
/// flags and the set disagree; the work is then dropped, which abandons its
/// completion signal.
fn register_started(
    scheduler: &mut Scheduler,
    in_flight: &mut InFlightSet,
    work: InFlightWork,
) -> DispatchStatus {
    if !scheduler.mark_in_flight(&work.connector) {
        warn!(
            connector = %work.connector,
            pid = work.pid,
            "launched run refused by the scheduler; abandoning it"
        );
        return DispatchStatus::Failed;
    }

    match in_flight.insert(work) {
        Ok(()) => DispatchStatus::Launched,
        Err(work) => {
            // The tracked run keeps the flag set until it is collected.
            warn!(connector = %work.connector, pid = work.pid, "duplicate in-flight run discarded");
            DispatchStatus::Failed
        }
    }
}

enum Attempt {
    Started(InFlightWork),
    ScriptMissing,
    MissingMandatory,
    PoolSaturated,
}

fn try_launch<L: LaunchBackend>(
    spec: &ConnectorSpec,
    launcher: &mut L,
    fs: &dyn FileSystem,
) -> Result<Attempt> {
    let Some(request) = LaunchRequest::from_spec(spec) else {
        return Ok(Attempt::MissingMandatory);
    };

    if !fs.is_dir(&spec.output_dir) {
        fs.create_dir_all(&spec.output_dir).map_err(CycleError::Other)?;
    }

    Ok(match launcher.launch(&request)? {
        Launch::Started(work) => Attempt::Started(work),
        Launch::ScriptMissing => Attempt::ScriptMissing,
        Launch::PoolSaturated => Attempt::PoolSaturated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn spec(name: &str) -> ConnectorSpec {
        ConnectorSpec {
            name: name.to_string(),
            run_interval: Duration::from_secs(1),
            script_path: Some(PathBuf::from(format!("{name}.sh"))),
            output_dir: PathBuf::from(format!("out/{name}")),
            params: Some(Default::default()),
            interpreter: None,
            timeout: None,
        }
    }

    fn work(name: &str) -> InFlightWork {
        let (_tx, rx) = oneshot::channel();
        InFlightWork::new(name.to_string(), Some(42), rx)
    }

    #[test]
    fn started_run_is_flagged_and_tracked() {
        let mut sched = Scheduler::new(vec![spec("A")]);
        let mut set = InFlightSet::new();

        assert_eq!(register_started(&mut sched, &mut set, work("A")), DispatchStatus::Launched);
        assert_eq!(sched.in_flight_count(), 1);
        assert!(set.contains("A"));
    }

    #[test]
    fn run_refused_by_scheduler_is_a_failed_dispatch() {
        let mut sched = Scheduler::new(vec![spec("A")]);
        let mut set = InFlightSet::new();
        assert!(sched.mark_in_flight("A"));

        assert_eq!(register_started(&mut sched, &mut set, work("A")), DispatchStatus::Failed);
        assert!(set.is_empty());

        assert_eq!(register_started(&mut sched, &mut set, work("Gone")), DispatchStatus::Failed);
        assert!(set.is_empty());
    }

    #[test]
    fn duplicate_tracked_run_is_a_failed_dispatch() {
        let mut sched = Scheduler::new(vec![spec("A")]);
        let mut set = InFlightSet::new();
        set.insert(work("A")).unwrap();

        assert_eq!(register_started(&mut sched, &mut set, work("A")), DispatchStatus::Failed);
        assert_eq!(set.len(), 1);
    }
}
