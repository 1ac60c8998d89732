// src/exec/launcher.rs

//! Production launcher: real OS processes drained on a bounded worker pool.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, info};

use crate::errors::{CycleError, Result};
use crate::exec::backend::{InFlightWork, Launch, LaunchBackend, LaunchRequest};
use crate::exec::worker::drain_child;
use crate::fs::FileSystem;

/// Starts connector processes with `tokio::process::Command`.
///
/// Every started process takes one slot of a fixed-size worker pool until its
/// worker has collected it; when no slot is free, [`Launch::PoolSaturated`]
/// is returned and nothing is spawned. Must be used from within a Tokio
/// runtime.
#[derive(Debug)]
pub struct ProcessLauncher {
    fs: Arc<dyn FileSystem>,
    slots: Arc<Semaphore>,
    pool_size: usize,
}

impl ProcessLauncher {
    pub fn new(fs: Arc<dyn FileSystem>, pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            fs,
            slots: Arc::new(Semaphore::new(pool_size)),
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Worker slots not held by a running process.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

impl LaunchBackend for ProcessLauncher {
    fn launch(&mut self, request: &LaunchRequest) -> Result<Launch> {
        if !self.fs.is_file(&request.script_path) {
            return Ok(Launch::ScriptMissing);
        }

        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            debug!(
                connector = %request.connector,
                pool_size = self.pool_size,
                "worker pool saturated; launch postponed"
            );
            return Ok(Launch::PoolSaturated);
        };

        let payload = request.payload_line()?;

        let mut cmd = build_command(request);
        let child = cmd.spawn().map_err(|source| CycleError::Launch {
            connector: request.connector.clone(),
            source,
        })?;
        let pid = child.id();

        info!(
            connector = %request.connector,
            pid,
            script = %request.script_path.display(),
            "activated connector"
        );

        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(drain_child(
            request.connector.clone(),
            child,
            payload,
            request.timeout,
            permit,
            done_tx,
        ));

        Ok(Launch::Started(InFlightWork::new(
            request.connector.clone(),
            pid,
            done_rx,
        )))
    }
}

/// Build the command for a request: `<interpreter> <script>` or the script
/// itself.
fn build_command(request: &LaunchRequest) -> Command {
    let mut cmd = match &request.interpreter {
        Some(interpreter) => {
            let mut c = Command::new(interpreter);
            c.arg(&request.script_path);
            c
        }
        None => Command::new(executable_path(&request.script_path)),
    };

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Bare relative names would be looked up on `PATH`; anchor them to the
/// working directory instead.
fn executable_path(script: &Path) -> PathBuf {
    if script.is_relative() && script.components().count() == 1 {
        Path::new(".").join(script)
    } else {
        script.to_path_buf()
    }
}
