//! Database Snapshot Agent
//!
//! Periodically dumps a MySQL database and uploads the dump to an
//! S3-compatible artifact store.

// dbsnapshot/src/main.rs
mod backup;
mod config;
mod errors;
mod scheduler;
mod utils;

use anyhow::{Context, Result};
use backup::BackupCycle;
use backup::s3_upload::S3Connector;
use backup::store::StoreConnector;
use config::BackupCycleConfig;
use scheduler::Scheduler;
use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use utils::clock::SystemClock;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = utils::logging::init_tracing_subscriber() {
        eprintln!("❌ Error: {:?}", e);
        return ExitCode::FAILURE;
    }
    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let config = BackupCycleConfig::from_env().context("Failed to load backup configuration")?;
    info!(
        "Loaded configuration for database {} on {} (folder {}, prefix {})",
        config.database.name, config.database.host, config.destination_folder, config.artifact_prefix
    );

    let command = env::args().nth(1).map(|arg| arg.trim().to_string());
    match command.as_deref().unwrap_or("run") {
        "run" => {
            prepare_local_dir(&config.local_backup_dir)?;
            let interval = config.interval;
            let cycle = new_cycle(config);
            Scheduler::new(interval, cycle).run_until(shutdown_signal()).await;
        }
        "once" => {
            prepare_local_dir(&config.local_backup_dir)?;
            let result = new_cycle(config).run().await;
            result.log();
            if let Some(stage) = result.failed_stage() {
                anyhow::bail!("Backup cycle for {} failed at {} stage", result.artifact(), stage);
            }
        }
        "check" => {
            let program = utils::find_dump_executable(&config.dump_command.program)?;
            info!("✓ Dump utility found at {}", program.display());
            S3Connector
                .connect(&config.credentials_path)
                .await
                .context("Artifact store check failed")?;
            info!("✓ Artifact store session established");
        }
        other => {
            anyhow::bail!("Invalid command {:?}. Use 'run' (default), 'once' or 'check'.", other);
        }
    }
    Ok(())
}

fn new_cycle(config: BackupCycleConfig) -> BackupCycle {
    BackupCycle::new(Arc::new(config), Arc::new(SystemClock), Arc::new(S3Connector))
}

/// Creates the local working directory for artifacts.
fn prepare_local_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create local backup directory: {}", dir.display()))?;
    info!("📂 Local artifacts are written to {}", dir.display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("⚠️ Could not listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
}
