// src/exec/worker.rs

//! Worker task draining one connector process.

use std::io;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tokio::sync::{oneshot, OwnedSemaphorePermit};
use tracing::{debug, info, warn};

use crate::engine::ConnectorName;
use crate::exec::backend::{DrainError, DrainResult, ProcessOutput};
use crate::types::exit_code;

/// Feed the payload line to the child, collect stdout/stderr and the exit
/// status, then resolve `done`.
///
/// Writing stdin and reading the output pipes happen concurrently, so a child
/// that fills its stdout before reading stdin cannot deadlock against us.
/// The worker slot (`permit`) is held until the child has been collected.
/// With a `timeout`, an overdue child is killed (the command is built with
/// `kill_on_drop`) and the signal resolves with [`DrainError::TimedOut`].
pub async fn drain_child(
    connector: ConnectorName,
    child: Child,
    payload: String,
    timeout: Option<Duration>,
    permit: OwnedSemaphorePermit,
    done: oneshot::Sender<DrainResult>,
) {
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, feed_and_collect(&connector, child, payload)).await {
            Ok(result) => result,
            Err(_) => Err(DrainError::TimedOut(limit)),
        },
        None => feed_and_collect(&connector, child, payload).await,
    };
    drop(permit);

    match &result {
        Ok(output) => info!(
            connector = %connector,
            exit_code = output.exit_code,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "connector process exited"
        ),
        Err(err) => warn!(connector = %connector, error = %err, "connector process could not be collected"),
    }

    if done.send(result).is_err() {
        debug!(connector = %connector, "collector went away before the run finished");
    }
}

async fn feed_and_collect(
    connector: &str,
    mut child: Child,
    payload: String,
) -> DrainResult {
    let stdin = child.stdin.take();

    let feed = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.flush().await?;
            // Dropping closes the pipe so the child sees EOF after the line.
        }
        Ok::<(), io::Error>(())
    };

    let (fed, output) = tokio::join!(feed, child.wait_with_output());

    if let Err(err) = fed {
        // Children that never read stdin close the pipe early; the run is
        // still judged by its exit status.
        debug!(connector = %connector, error = %err, "could not deliver params to connector stdin");
    }

    let output = output?;
    Ok(ProcessOutput {
        exit_code: output.status.code().unwrap_or(exit_code::TERMINATED),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
