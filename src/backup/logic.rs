// dbsnapshot/src/backup/logic.rs
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};

use crate::backup::db_dump::dump_database;
use crate::backup::naming::artifact_name;
use crate::backup::store::{StoreConnector, upload_artifact};
use crate::config::BackupCycleConfig;
use crate::errors::{BackupError, Result, Stage};
use crate::utils::clock::Clock;

/// Outcome of one cycle. Logged by whoever ran the cycle, then discarded.
#[derive(Debug)]
pub enum CycleResult {
    Succeeded { artifact: String },
    Failed { artifact: String, error: BackupError },
}

impl CycleResult {
    pub fn artifact(&self) -> &str {
        match self {
            CycleResult::Succeeded { artifact } | CycleResult::Failed { artifact, .. } => artifact,
        }
    }

    /// Stage that failed, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            CycleResult::Succeeded { .. } => None,
            CycleResult::Failed { error, .. } => Some(error.stage()),
        }
    }

    /// Emits the single outcome line for the cycle.
    pub fn log(&self) {
        match self {
            CycleResult::Succeeded { artifact } => {
                info!("✅ Backup completed successfully: {}", artifact);
            }
            CycleResult::Failed { artifact, error } => {
                let stage = error.stage();
                error!(%stage, %artifact, "❌ Backup cycle failed at {} stage: {}", stage, error);
            }
        }
    }
}

/// One pass of name → dump → upload.
pub struct BackupCycle {
    config: Arc<BackupCycleConfig>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StoreConnector>,
}

impl BackupCycle {
    pub fn new(
        config: Arc<BackupCycleConfig>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StoreConnector>,
    ) -> Self {
        Self { config, clock, store }
    }

    /// Runs a full cycle. Never fails: stage errors are returned inside the
    /// [`CycleResult`].
    pub async fn run(&self) -> CycleResult {
        let artifact = artifact_name(
            &self.config.artifact_prefix,
            &self.config.database.name,
            self.clock.now(),
        );
        let span = info_span!("backup_cycle", artifact = %artifact);

        async move {
            match self.produce_and_upload(&artifact).await {
                Ok(()) => CycleResult::Succeeded { artifact },
                Err(error) => CycleResult::Failed { artifact, error },
            }
        }
        .instrument(span)
        .await
    }

    async fn produce_and_upload(&self, artifact: &str) -> Result<()> {
        let config = &self.config;
        let local = dump_database(
            &config.dump_command,
            &config.database,
            &config.local_backup_dir.join(artifact),
            config.dump_timeout,
            config.keep_local_artifacts,
        )
        .await?;

        upload_artifact(
            self.store.as_ref(),
            &config.credentials_path,
            local.path(),
            artifact,
            &config.destination_folder,
            config.upload_timeout,
        )
        .await
        // `local` drops here and takes the file with it unless retained.
    }
}
