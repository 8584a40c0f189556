// dbsnapshot/src/backup/db_dump.rs
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{DatabaseConfig, DumpCommand};
use crate::errors::{BackupError, Result};
use crate::utils::find_dump_executable;

/// A dump file on local disk, owned by the cycle that produced it.
///
/// The file is removed when the guard is dropped unless it was created
/// with `retain` set.
#[derive(Debug)]
pub struct LocalArtifact {
    path: PathBuf,
    retain: bool,
}

impl LocalArtifact {
    pub fn new(path: PathBuf, retain: bool) -> Self {
        Self { path, retain }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LocalArtifact {
    fn drop(&mut self) {
        if self.retain {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed local artifact {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("⚠️ Could not remove local artifact {}: {}", self.path.display(), e),
        }
    }
}

/// Runs the dump utility against `database` and streams its stdout into a
/// newly created file at `artifact_path`.
///
/// The file must not already exist. A partial file left by a failed dump is
/// handed to a [`LocalArtifact`] guard like a complete one, so it is cleaned
/// up the same way.
pub async fn dump_database(
    command: &DumpCommand,
    database: &DatabaseConfig,
    artifact_path: &Path,
    timeout: Option<Duration>,
    retain: bool,
) -> Result<LocalArtifact> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(artifact_path)
        .await
        .map_err(|source| BackupError::ArtifactCreation {
            path: artifact_path.to_path_buf(),
            source,
        })?;
    let artifact = LocalArtifact::new(artifact_path.to_path_buf(), retain);
    let stdout = file.into_std().await;

    let dump_failed = |reason: String| BackupError::DumpExecution {
        database: database.name.clone(),
        reason,
    };

    let program = find_dump_executable(&command.program).map_err(|e| dump_failed(e.to_string()))?;
    info!(
        "Dumping database {} from {} to {} using {}...",
        database.name,
        database.host,
        artifact_path.display(),
        program.display()
    );

    // Connection arguments come last; the password is passed here and must
    // never be logged.
    let child = Command::new(&program)
        .args(&command.args)
        .arg(format!("-h{}", database.host))
        .arg(format!("-u{}", database.user))
        .arg(format!("-p{}", database.password))
        .arg(&database.name)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| dump_failed(format!("failed to start {}: {}", program.display(), e)))?;

    let waiting = child.wait_with_output();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, waiting).await.map_err(|_| {
            dump_failed(format!(
                "{} did not finish within {}",
                program.display(),
                humantime::format_duration(limit)
            ))
        })?,
        None => waiting.await,
    }
    .map_err(|e| dump_failed(format!("failed waiting for {}: {}", program.display(), e)))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        return Err(dump_failed(format!(
            "{} exited with {}\nStderr: {}",
            program.display(),
            output.status,
            stderr.trim()
        )));
    }
    if !stderr.trim().is_empty() {
        debug!("Dump utility stderr: {}", stderr.trim());
    }

    match tokio::fs::metadata(artifact_path).await {
        Ok(meta) => info!("✓ Database {} dumped ({} bytes)", database.name, meta.len()),
        Err(_) => info!("✓ Database {} dumped", database.name),
    }
    Ok(artifact)
}
