// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually starting connector programs with
//! `tokio::process::Command` and handing their output back to the runtime
//! through per-run completion signals.
//!
//! - [`backend`] provides the `LaunchBackend` trait and the launch/completion
//!   types shared with the runtime (and with fake launchers in tests).
//! - [`launcher`] is the production `ProcessLauncher` with its bounded worker
//!   pool.
//! - [`worker`] drains one child process and resolves its signal.

pub mod backend;
pub mod launcher;
pub mod worker;

pub use backend::{
    CompletionPoll, DrainError, DrainResult, InFlightWork, Launch, LaunchBackend, LaunchRequest,
    ProcessOutput,
};
pub use launcher::ProcessLauncher;
