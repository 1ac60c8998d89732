// src/engine/collect.rs

//! Collection phase: turn finished runs into outcomes, state updates and
//! result files.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::engine::in_flight::{Finished, InFlightSet};
use crate::engine::ConnectorName;
use crate::outcome::{classify, Outcome};
use crate::output::{result_file_path, ResultWriter};
use crate::schedule::Scheduler;

/// Record of one collected run.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedRun {
    pub connector: ConnectorName,
    pub outcome: Outcome,
    /// Where the result was (or should have been) written.
    pub result_path: PathBuf,
    /// The connector was removed from the schedule by this run.
    pub removed: bool,
    /// Set when the result file could not be written.
    pub write_error: Option<String>,
    /// Time from launch until the run was collected.
    pub duration: Duration,
}

/// Collect every in-flight run whose completion signal has resolved.
///
/// `now` drives scheduling, `wall` names the result files. Runs still being
/// drained stay in the set. A broken signal is collected as an unknown
/// failure so the connector's flags are always reset.
pub fn collect_finished(
    scheduler: &mut Scheduler,
    in_flight: &mut InFlightSet,
    writer: &ResultWriter,
    now: Instant,
    wall: DateTime<Local>,
) -> Vec<CollectedRun> {
    in_flight
        .take_finished()
        .into_iter()
        .filter_map(|finished| collect_one(scheduler, writer, finished, now, &wall))
        .collect()
}

fn collect_one(
    scheduler: &mut Scheduler,
    writer: &ResultWriter,
    finished: Finished,
    now: Instant,
    wall: &DateTime<Local>,
) -> Option<CollectedRun> {
    let connector = finished.connector().clone();
    let duration = finished.work().started_at.elapsed();
    let outcome = outcome_of(finished);

    let Some(spec) = scheduler.spec_of(&connector) else {
        warn!(connector = %connector, "finished run for a connector that is no longer scheduled");
        return None;
    };

    let step = scheduler.record_completion(&connector, &outcome, now)?;
    let result_path = result_file_path(&spec.output_dir, &spec.name, wall);
    let value = outcome.result_value(&connector);

    let write_error = match writer.write(&result_path, &value) {
        Ok(()) => None,
        Err(err) => {
            let detail = format!("{err:#}");
            error!(
                connector = %connector,
                path = %result_path.display(),
                error = %detail,
                "failed to write result file"
            );
            Some(detail)
        }
    };

    if outcome.is_success() && write_error.is_none() {
        info!(
            connector = %connector,
            run = step.run_number,
            elapsed_ms = duration.as_millis() as u64,
            path = %result_path.display(),
            "connector completed successfully; results written"
        );
    } else if !outcome.is_success() {
        warn!(
            connector = %connector,
            run = step.run_number,
            elapsed_ms = duration.as_millis() as u64,
            outcome = outcome.kind(),
            "{}",
            value.as_str().unwrap_or_default()
        );
    }

    Some(CollectedRun {
        connector,
        outcome,
        result_path,
        removed: step.removed,
        write_error,
        duration,
    })
}

fn outcome_of(finished: Finished) -> Outcome {
    match finished {
        Finished::Resolved(_, Ok(output)) => {
            classify(output.exit_code, &output.stdout, &output.stderr)
        }
        Finished::Resolved(_, Err(err)) => Outcome::UnknownFailure(err.to_string()),
        Finished::Broken(work) => Outcome::UnknownFailure(format!(
            "worker for pid {:?} stopped without reporting a result",
            work.pid
        )),
    }
}
