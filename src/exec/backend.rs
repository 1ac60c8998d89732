// src/exec/backend.rs

//! Pluggable launcher abstraction.
//!
//! The runtime talks to a `LaunchBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake launcher in tests while
//! keeping the production implementation in [`launcher`](super::launcher).
//!
//! A launch never waits for the child: it hands back an [`InFlightWork`]
//! whose completion signal is resolved by a worker once the child's output
//! has been fully drained.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::config::{ConnectorParams, ConnectorSpec};
use crate::engine::ConnectorName;
use crate::errors::Result;

/// Everything needed to start one connector run.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub connector: ConnectorName,
    pub script_path: PathBuf,
    pub interpreter: Option<String>,
    /// Parameter payload, `connector_name` already injected.
    pub params: ConnectorParams,
    pub timeout: Option<Duration>,
}

impl LaunchRequest {
    /// Build a request from a spec; `None` if the spec lacks a script path
    /// or params.
    pub fn from_spec(spec: &ConnectorSpec) -> Option<Self> {
        let script_path = spec.script_path.clone()?;
        let mut params = spec.params.clone()?;
        params.insert(
            "connector_name".to_string(),
            Value::String(spec.name.clone()),
        );

        Some(Self {
            connector: spec.name.clone(),
            script_path,
            interpreter: spec.interpreter.clone(),
            params,
            timeout: spec.timeout,
        })
    }

    /// The single stdin line: compact JSON followed by `\n`.
    pub fn payload_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(&self.params)?;
        line.push('\n');
        Ok(line)
    }
}

/// Captured output of a finished connector process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `-1` if the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Why a worker could not produce a [`ProcessOutput`].
#[derive(Error, Debug)]
pub enum DrainError {
    #[error("connector did not finish within {0:?} and was killed")]
    TimedOut(Duration),

    #[error("failed to collect connector output: {0}")]
    Io(#[from] std::io::Error),
}

/// What a worker sends through the completion signal.
pub type DrainResult = std::result::Result<ProcessOutput, DrainError>;

/// State of an in-flight run's completion signal.
#[derive(Debug)]
pub enum CompletionPoll {
    /// The worker is still draining the child.
    Pending,
    /// The worker resolved the signal.
    Ready(DrainResult),
    /// The worker went away without resolving the signal.
    Broken,
}

/// One launched, not yet collected, connector process.
#[derive(Debug)]
pub struct InFlightWork {
    pub connector: ConnectorName,
    pub pid: Option<u32>,
    pub started_at: Instant,
    completion: oneshot::Receiver<DrainResult>,
}

impl InFlightWork {
    pub fn new(
        connector: ConnectorName,
        pid: Option<u32>,
        completion: oneshot::Receiver<DrainResult>,
    ) -> Self {
        Self {
            connector,
            pid,
            started_at: Instant::now(),
            completion,
        }
    }

    /// Non-blocking check of the completion signal.
    pub fn poll_completion(&mut self) -> CompletionPoll {
        match self.completion.try_recv() {
            Ok(result) => CompletionPoll::Ready(result),
            Err(TryRecvError::Empty) => CompletionPoll::Pending,
            Err(TryRecvError::Closed) => CompletionPoll::Broken,
        }
    }
}

/// Result of asking a backend to start a connector.
#[derive(Debug)]
pub enum Launch {
    /// The process is running; its output is being drained by a worker.
    Started(InFlightWork),
    /// The script path does not name an existing file.
    ScriptMissing,
    /// Every worker slot is busy; nothing was started.
    PoolSaturated,
}

/// Trait abstracting how connector processes are started.
///
/// Production code uses [`ProcessLauncher`](super::ProcessLauncher); tests
/// can provide their own implementation that doesn't spawn real processes.
/// Implementations must return promptly: all waiting on the child happens
/// behind the returned completion signal.
pub trait LaunchBackend: Send {
    fn launch(&mut self, request: &LaunchRequest) -> Result<Launch>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn spec() -> ConnectorSpec {
        ConnectorSpec {
            name: "VT1".into(),
            run_interval: Duration::from_secs(5),
            script_path: Some(PathBuf::from("vt.py")),
            output_dir: PathBuf::from("out"),
            params: Some(
                json!({"api_key": "k", "source_folder_path": "in"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            interpreter: Some("python3".into()),
            timeout: None,
        }
    }

    #[test]
    fn request_injects_connector_name() {
        let req = LaunchRequest::from_spec(&spec()).unwrap();

        assert_eq!(req.params["connector_name"], "VT1");
        assert_eq!(req.params["api_key"], "k");

        let line = req.payload_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let parsed: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["connector_name"], "VT1");
    }

    #[test]
    fn request_needs_script_and_params() {
        let mut s = spec();
        s.params = None;
        assert!(LaunchRequest::from_spec(&s).is_none());

        let mut s = spec();
        s.script_path = None;
        assert!(LaunchRequest::from_spec(&s).is_none());
    }

    #[test]
    fn completion_poll_reports_all_states() {
        let (tx, rx) = oneshot::channel();
        let mut work = InFlightWork::new("A".into(), None, rx);
        assert!(matches!(work.poll_completion(), CompletionPoll::Pending));

        tx.send(Ok(ProcessOutput {
            exit_code: 0,
            stdout: "{}".into(),
            stderr: String::new(),
        }))
        .unwrap();
        assert!(matches!(work.poll_completion(), CompletionPoll::Ready(Ok(_))));

        let (tx, rx) = oneshot::channel::<DrainResult>();
        let mut work = InFlightWork::new("B".into(), None, rx);
        drop(tx);
        assert!(matches!(work.poll_completion(), CompletionPoll::Broken));
    }
}
