use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use connector_cycle::engine::ConnectorName;
use connector_cycle::errors::{CycleError, Result};
use connector_cycle::exec::{
    DrainError, DrainResult, InFlightWork, Launch, LaunchBackend, LaunchRequest, ProcessOutput,
};
use tokio::sync::oneshot;

/// What a fake run of a connector does.
#[derive(Debug, Clone)]
pub enum FakeRun {
    /// Finish immediately with this exit code and output.
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// Report that the script path does not exist.
    ScriptMissing,
    /// Report that every worker slot is busy.
    PoolSaturated,
    /// Fail the launch itself (e.g. spawn error).
    SpawnError(String),
    /// Start, but never finish until [`FakeLauncher::release`] is called.
    Hang,
    /// Start, then drop the completion signal without resolving it.
    DropSignal,
    /// Start, then resolve with a timeout error.
    TimedOut(Duration),
}

impl FakeRun {
    pub fn exit(code: i32, stdout: &str) -> Self {
        FakeRun::Exit {
            code,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }
}

/// A fake launcher that:
/// - records every launch request it receives
/// - plays back scripted [`FakeRun`]s per connector (the last planned run
///   repeats), defaulting to `exit 0` with `{}` on stdout
/// - resolves completion signals immediately, except for hanging runs.
#[derive(Debug)]
pub struct FakeLauncher {
    plans: HashMap<ConnectorName, VecDeque<FakeRun>>,
    requests: Arc<Mutex<Vec<LaunchRequest>>>,
    hanging: HashMap<ConnectorName, oneshot::Sender<DrainResult>>,
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            plans: HashMap::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
            hanging: HashMap::new(),
        }
    }

    /// Append a planned run for `connector`.
    pub fn with_run(mut self, connector: &str, run: FakeRun) -> Self {
        self.plans
            .entry(connector.to_string())
            .or_default()
            .push_back(run);
        self
    }

    /// Shared handle on the recorded requests, usable after the launcher
    /// has been moved into a runtime.
    pub fn requests_handle(&self) -> Arc<Mutex<Vec<LaunchRequest>>> {
        Arc::clone(&self.requests)
    }

    /// Names of launched connectors, in launch order.
    pub fn launched(&self) -> Vec<ConnectorName> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.connector.clone())
            .collect()
    }

    pub fn launch_count(&self, connector: &str) -> usize {
        self.launched().iter().filter(|n| *n == connector).count()
    }

    /// Finish a hanging run. Returns `false` if `connector` has none.
    pub fn release(&mut self, connector: &str, code: i32, stdout: &str) -> bool {
        match self.hanging.remove(connector) {
            Some(tx) => tx
                .send(Ok(ProcessOutput {
                    exit_code: code,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                }))
                .is_ok(),
            None => false,
        }
    }

    fn next_run(&mut self, connector: &str) -> FakeRun {
        match self.plans.get_mut(connector) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if queue.len() == 1 => queue[0].clone(),
            _ => FakeRun::exit(0, "{}"),
        }
    }
}

impl LaunchBackend for FakeLauncher {
    fn launch(&mut self, request: &LaunchRequest) -> Result<Launch> {
        let run = self.next_run(&request.connector);

        let (tx, rx) = oneshot::channel::<DrainResult>();
        match run {
            FakeRun::ScriptMissing => return Ok(Launch::ScriptMissing),
            FakeRun::PoolSaturated => return Ok(Launch::PoolSaturated),
            FakeRun::SpawnError(msg) => {
                return Err(CycleError::Launch {
                    connector: request.connector.clone(),
                    source: std::io::Error::other(msg),
                });
            }
            FakeRun::Exit {
                code,
                stdout,
                stderr,
            } => {
                let _ = tx.send(Ok(ProcessOutput {
                    exit_code: code,
                    stdout,
                    stderr,
                }));
            }
            FakeRun::TimedOut(limit) => {
                let _ = tx.send(Err(DrainError::TimedOut(limit)));
            }
            FakeRun::Hang => {
                self.hanging.insert(request.connector.clone(), tx);
            }
            FakeRun::DropSignal => drop(tx),
        }

        self.requests.lock().unwrap().push(request.clone());

        Ok(Launch::Started(InFlightWork::new(
            request.connector.clone(),
            None,
            rx,
        )))
    }
}
