// src/lib.rs

pub mod backends;
pub mod cli;
pub mod config;
pub mod context;
pub mod daemon;
pub mod errors;
pub mod logging;
pub mod rotation;
pub mod runner;
pub mod service;
pub mod types;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::daemon::Daemon;
use crate::service::ServiceHandle;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - runner registry initialisation (before any config is read)
/// - config loading
/// - the daemon and its runners
/// - SIGINT / SIGTERM handling, which stands in for the service manager's
///   stop request
pub async fn run(args: CliArgs) -> Result<()> {
    // A duplicate registration is a wiring bug; refuse to start.
    let registry = runner::registry::init()?;

    let cfg = load_and_validate(&args.config)?;

    if args.check_config {
        print_config_summary(&cfg);
        return Ok(());
    }

    let daemon = Daemon::from_config(&cfg, registry, ServiceHandle::default())?;
    let failed = daemon.start().await;
    info!(
        service = %daemon.service().display_name(),
        started = daemon.runner_names().count() - failed.len(),
        failed = failed.len(),
        "sidecar running"
    );

    wait_for_shutdown().await;

    daemon.stop().await;
    for (name, status) in daemon.statuses() {
        info!(backend = %name, status = %status.kind, message = %status.message, "final status");
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received Ctrl-C"),
        _ = term.recv() => info!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
    }
}

/// `--check-config` output: settings and backends, nothing launched.
fn print_config_summary(cfg: &ConfigFile) {
    println!("sidecar config check");
    println!("  log_path = {}", cfg.log_path.display());
    println!("  log_rotation_time = {:?}", cfg.log_rotation_time);
    println!("  log_max_age = {:?}", cfg.log_max_age);
    if let Some(ref dir) = cfg.daemon.dir {
        println!("  working_dir = {}", dir.display());
    }
    for (key, _) in cfg.daemon.env.iter() {
        println!("  env: {key}");
    }
    println!("  supervision = {:?}", cfg.policy);
    println!();

    println!("backends ({}):", cfg.backend.len());
    for (name, backend) in cfg.backend.iter() {
        println!("  - {name}");
        println!("      exec_path: {}", backend.exec_path);
        if !backend.args.is_empty() {
            println!("      args: {:?}", backend.args);
        }
        println!("      driver: {}", backend.driver);
        if !backend.enabled {
            println!("      enabled: false");
        }
    }
}
