// dbsnapshot/src/backup/store.rs
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::time::Instant;
use tracing::info;

use crate::errors::{BackupError, Result};

/// Opens authenticated sessions against a remote artifact store.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Establishes a session using the credentials file at `credentials`.
    async fn connect(&self, credentials: &Path) -> Result<Box<dyn StoreSession>>;
}

/// An authenticated session with the artifact store.
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Creates `name` inside `folder`, streaming `content` as its payload.
    async fn create_artifact(&self, folder: &str, name: &str, content: File) -> Result<()>;
}

/// Sends the local artifact at `artifact_path` to the store as `name` in
/// `folder`. `timeout`, if set, bounds the whole stage.
pub async fn upload_artifact(
    connector: &dyn StoreConnector,
    credentials: &Path,
    artifact_path: &Path,
    name: &str,
    folder: &str,
    timeout: Option<Duration>,
) -> Result<()> {
    // A limit past the end of the clock is no limit at all.
    let deadline = timeout.and_then(|limit| Some((Instant::now().checked_add(limit)?, limit)));

    info!("Connecting to artifact store...");
    let session = within(deadline, connector.connect(credentials), |limit| {
        BackupError::StoreConnection(format!(
            "no session within {}",
            humantime::format_duration(limit)
        ))
    })
    .await?;

    let content = File::open(artifact_path)
        .await
        .map_err(|e| BackupError::ArtifactRead {
            path: artifact_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    info!("Uploading {} to folder {}...", name, folder);
    within(deadline, session.create_artifact(folder, name, content), |limit| {
        BackupError::UploadTransfer {
            name: name.to_string(),
            reason: format!("transfer did not finish within {}", humantime::format_duration(limit)),
        }
    })
    .await?;

    info!("✓ Uploaded {} to folder {}", name, folder);
    Ok(())
}

async fn within<T, F, E>(deadline: Option<(Instant, Duration)>, fut: F, elapsed: E) -> Result<T>
where
    F: Future<Output = Result<T>>,
    E: FnOnce(Duration) -> BackupError,
{
    match deadline {
        Some((at, limit)) => tokio::time::timeout_at(at, fut)
            .await
            .map_err(|_| elapsed(limit))?,
        None => fut.await,
    }
}
