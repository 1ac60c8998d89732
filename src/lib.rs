// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod outcome;
pub mod output;
pub mod schedule;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate_as, ConfigFile};
use crate::engine::{Runtime, RuntimeOptions};
use crate::exec::ProcessLauncher;
use crate::fs::{FileSystem, RealFileSystem};
use crate::schedule::Scheduler;
use crate::types::ConfigFormat;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - scheduler / in-flight tracking / runtime
/// - process launcher and its worker pool
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let format = args
        .format
        .unwrap_or_else(|| ConfigFormat::from_path(&args.config));
    let cfg = load_and_validate_as(&args.config, format)?;
    info!(
        config = %args.config.display(),
        connectors = cfg.connectors.len(),
        "configuration loaded"
    );

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let scheduler = Scheduler::from_config(&cfg);
    if scheduler.is_empty() {
        warn!("no schedulable connectors; the service will idle");
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let pool_size = cfg.service.worker_pool_size(scheduler.len());
    let launcher = ProcessLauncher::new(Arc::clone(&fs), pool_size);
    info!(pool_size, "worker pool ready");

    let options = RuntimeOptions {
        tick_interval: cfg.service.tick_interval(),
        exit_when_idle: args.once,
    };
    let runtime = Runtime::new(scheduler, launcher, fs, options);

    // Ctrl-C ends the loop; children still running are abandoned.
    tokio::select! {
        res = runtime.run() => res?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("shutdown requested; abandoning in-flight connectors");
        }
    }

    Ok(())
}

/// Simple dry-run output: print connectors and what would be launched.
fn print_dry_run(cfg: &ConfigFile) {
    println!("connector-cycle dry-run");
    println!("  service.tick_interval_ms = {}", cfg.service.tick_interval_ms);
    println!("  service.max_workers = {}", cfg.service.max_workers);
    println!();

    println!("connectors ({}):", cfg.connectors.len());
    for spec in &cfg.connectors {
        println!("  - {}", spec.name);
        println!("      run_interval_seconds: {}", spec.run_interval.as_secs());
        println!("      output_folder_path: {}", spec.output_dir.display());
        match &spec.script_path {
            Some(path) => println!("      script_file_path: {}", path.display()),
            None => println!("      script_file_path: <missing>"),
        }
        if let Some(ref interpreter) = spec.interpreter {
            println!("      interpreter: {interpreter}");
        }
        if let Some(timeout) = spec.timeout {
            println!("      timeout_seconds: {}", timeout.as_secs());
        }
        match &spec.params {
            Some(params) => println!("      params: {} key(s)", params.len()),
            None => println!("      params: <missing>"),
        }
        if !spec.is_schedulable() {
            println!("      (not schedulable)");
        }
    }

    debug!("dry-run complete (no execution)");
}
