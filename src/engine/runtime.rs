// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::engine::collect::{collect_finished, CollectedRun};
use crate::engine::dispatch::{dispatch_due, DispatchStatus};
use crate::engine::in_flight::InFlightSet;
use crate::engine::{ConnectorName, RuntimeOptions};
use crate::errors::Result;
use crate::exec::LaunchBackend;
use crate::fs::FileSystem;
use crate::output::ResultWriter;
use crate::schedule::Scheduler;

/// What a single tick did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub dispatched: Vec<(ConnectorName, DispatchStatus)>,
    pub collected: Vec<CollectedRun>,
}

impl TickReport {
    pub fn launched(&self) -> impl Iterator<Item = &str> {
        self.dispatched
            .iter()
            .filter(|(_, status)| *status == DispatchStatus::Launched)
            .map(|(name, _)| name.as_str())
    }
}

/// Drives the connector [`Scheduler`] tick by tick and delegates process
/// starts to a [`LaunchBackend`].
///
/// Each tick runs a dispatch phase (launch due connectors) followed by a
/// collection phase (classify finished runs and write their result files),
/// then sleeps for the tick interval. The runtime never waits on a child:
/// it only polls completion signals.
pub struct Runtime<L: LaunchBackend> {
    scheduler: Scheduler,
    launcher: L,
    in_flight: InFlightSet,
    writer: ResultWriter,
    fs: Arc<dyn FileSystem>,
    options: RuntimeOptions,
    /// Anchor mapping monotonic tick instants onto wall-clock time for
    /// result file names.
    origin: (Instant, DateTime<Local>),
}

impl<L: LaunchBackend> fmt::Debug for Runtime<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("in_flight", &self.in_flight)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<L: LaunchBackend> Runtime<L> {
    pub fn new(
        scheduler: Scheduler,
        launcher: L,
        fs: Arc<dyn FileSystem>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            launcher,
            in_flight: InFlightSet::new(),
            writer: ResultWriter::new(Arc::clone(&fs)),
            fs,
            options,
            origin: (Instant::now(), Local::now()),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    /// Whether `--once` mode is satisfied: every remaining connector has
    /// completed (or given up) a run and nothing is in flight.
    pub fn is_settled(&self) -> bool {
        self.in_flight.is_empty() && self.scheduler.all_synced()
    }

    /// Main loop.
    ///
    /// Runs until killed, or, with `exit_when_idle`, until
    /// [`Runtime::is_settled`].
    pub async fn run(mut self) -> Result<()> {
        info!(
            connectors = self.scheduler.len(),
            excluded = self.scheduler.excluded().len(),
            names = ?self.scheduler.connector_names().collect::<Vec<_>>(),
            tick_ms = self.options.tick_interval.as_millis() as u64,
            "connector-cycle runtime started"
        );

        loop {
            let report = self.tick(Instant::now());
            if !report.dispatched.is_empty() || !report.collected.is_empty() {
                debug!(
                    dispatched = report.dispatched.len(),
                    collected = report.collected.len(),
                    in_flight = self.in_flight.len(),
                    "tick finished"
                );
            }

            if self.options.exit_when_idle && self.is_settled() {
                info!("every connector ran once; stopping runtime");
                break;
            }

            tokio::time::sleep(self.options.tick_interval).await;
        }

        info!("runtime exiting");
        Ok(())
    }

    /// One tick at `now`: dispatch phase, then collection phase.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let dispatched = dispatch_due(
            &mut self.scheduler,
            &mut self.launcher,
            &mut self.in_flight,
            self.fs.as_ref(),
            now,
        );

        let wall = self.wall_time(now);
        let collected = collect_finished(
            &mut self.scheduler,
            &mut self.in_flight,
            &self.writer,
            now,
            wall,
        );

        TickReport {
            dispatched,
            collected,
        }
    }

    fn wall_time(&self, now: Instant) -> DateTime<Local> {
        let (origin_instant, origin_wall) = self.origin;
        let elapsed = now.saturating_duration_since(origin_instant);
        chrono::Duration::from_std(elapsed)
            .ok()
            .and_then(|d| origin_wall.checked_add_signed(d))
            .unwrap_or(origin_wall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorSpec;
    use crate::exec::{InFlightWork, Launch, LaunchRequest, ProcessOutput};
    use crate::fs::mock::MockFileSystem;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tokio::sync::oneshot;

    /// Finishes every run immediately with `{}` on stdout.
    struct InstantLauncher;

    impl LaunchBackend for InstantLauncher {
        fn launch(&mut self, request: &LaunchRequest) -> Result<Launch> {
            let (tx, rx) = oneshot::channel();
            tx.send(Ok(ProcessOutput {
                exit_code: 0,
                stdout: "{}".into(),
                stderr: String::new(),
            }))
            .unwrap();
            Ok(Launch::Started(InFlightWork::new(request.connector.clone(), None, rx)))
        }
    }

    fn spec(name: &str) -> ConnectorSpec {
        ConnectorSpec {
            name: name.to_string(),
            run_interval: Duration::from_secs(1),
            script_path: Some(PathBuf::from("a.sh")),
            output_dir: PathBuf::from("out"),
            params: Some(Default::default()),
            interpreter: None,
            timeout: None,
        }
    }

    #[test]
    fn tick_names_results_from_the_wall_clock_of_now() {
        let fs = Arc::new(MockFileSystem::new());
        let mut rt = Runtime::new(
            Scheduler::new(vec![spec("A")]),
            InstantLauncher,
            fs.clone(),
            RuntimeOptions::default(),
        );
        let now = rt.origin.0 + Duration::from_secs(90);
        let expected = crate::output::result_file_path(
            Path::new("out"),
            "A",
            &(rt.origin.1 + chrono::Duration::seconds(90)),
        );

        let report = rt.tick(now);

        assert_eq!(report.collected.len(), 1);
        assert_eq!(report.collected[0].result_path, expected);
        assert!(fs.is_file(&expected));
        assert!(rt.is_settled());
    }
}
