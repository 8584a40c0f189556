//! Fakes shared by the pipeline and scheduler tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

use crate::backup::store::{StoreConnector, StoreSession};
use crate::config::{BackupCycleConfig, DatabaseConfig, DumpCommand};
use crate::errors::{BackupError, Result};
use crate::utils::clock::Clock;

pub(crate) fn database() -> DatabaseConfig {
    DatabaseConfig {
        host: "db.internal".into(),
        user: "backup".into(),
        password: "s3cret".into(),
        name: "app_db".into(),
    }
}

/// A dump command running `script` under `sh -c`. The connection arguments
/// land in `$1`..`$4`.
pub(crate) fn sh(script: &str) -> DumpCommand {
    DumpCommand {
        program: "sh".into(),
        args: vec!["-c".into(), script.into(), "mysqldump".into()],
    }
}

pub(crate) fn cycle_config(local_dir: &Path, dump_command: DumpCommand) -> BackupCycleConfig {
    BackupCycleConfig {
        database: database(),
        destination_folder: "nightly".into(),
        artifact_prefix: "backup".into(),
        interval: Duration::from_secs(3600),
        credentials_path: "/credentials/store.json".into(),
        dump_command,
        local_backup_dir: local_dir.to_path_buf(),
        dump_timeout: None,
        upload_timeout: None,
        keep_local_artifacts: false,
    }
}

pub(crate) fn tick_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(3, 4, 5))
        .expect("valid tick time")
}

pub(crate) struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Advances one second every time it is read.
pub(crate) struct SteppingClock {
    start: NaiveDateTime,
    reads: AtomicI64,
}

impl SteppingClock {
    pub(crate) fn new(start: NaiveDateTime) -> Self {
        Self {
            start,
            reads: AtomicI64::new(0),
        }
    }

    pub(crate) fn reads(&self) -> i64 {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        self.start + TimeDelta::seconds(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredArtifact {
    pub folder: String,
    pub name: String,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct FakeStoreState {
    refuse_connection: AtomicBool,
    failing_uploads: AtomicUsize,
    stall: Mutex<Option<Duration>>,
    connects: AtomicUsize,
    credentials_seen: Mutex<Vec<String>>,
    uploads: Mutex<Vec<StoredArtifact>>,
    attempts: Mutex<Option<mpsc::UnboundedSender<bool>>>,
}

/// In-memory artifact store.
#[derive(Clone, Default)]
pub(crate) struct FakeStore {
    state: Arc<FakeStoreState>,
}

impl FakeStore {
    pub(crate) fn refusing() -> Self {
        let store = Self::default();
        store.state.refuse_connection.store(true, Ordering::SeqCst);
        store
    }

    /// Rejects the next `n` uploads, then accepts.
    pub(crate) fn failing_first(n: usize) -> Self {
        let store = Self::default();
        store.state.failing_uploads.store(n, Ordering::SeqCst);
        store
    }

    pub(crate) fn stalling(delay: Duration) -> Self {
        let store = Self::default();
        *store.state.stall.lock().unwrap() = Some(delay);
        store
    }

    /// Receives `true`/`false` for every accepted/rejected upload.
    pub(crate) fn watch_attempts(&self) -> mpsc::UnboundedReceiver<bool> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.state.attempts.lock().unwrap() = Some(tx);
        rx
    }

    pub(crate) fn uploads(&self) -> Vec<StoredArtifact> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn credentials_seen(&self) -> Vec<String> {
        self.state.credentials_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreConnector for FakeStore {
    async fn connect(&self, credentials: &Path) -> Result<Box<dyn StoreSession>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state
            .credentials_seen
            .lock()
            .unwrap()
            .push(credentials.display().to_string());
        if self.state.refuse_connection.load(Ordering::SeqCst) {
            return Err(BackupError::StoreConnection("invalid credentials".into()));
        }
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<FakeStoreState>,
}

#[async_trait]
impl StoreSession for FakeSession {
    async fn create_artifact(&self, folder: &str, name: &str, mut content: File) -> Result<()> {
        let stall = *self.state.stall.lock().unwrap();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }

        let mut bytes = Vec::new();
        content
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| BackupError::UploadTransfer {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let rejected = self
            .state
            .failing_uploads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !rejected {
            self.state.uploads.lock().unwrap().push(StoredArtifact {
                folder: folder.to_string(),
                name: name.to_string(),
                content: bytes,
            });
        }
        if let Some(tx) = self.state.attempts.lock().unwrap().as_ref() {
            let _ = tx.send(!rejected);
        }

        if rejected {
            return Err(BackupError::UploadTransfer {
                name: name.to_string(),
                reason: "storage quota exceeded".into(),
            });
        }
        Ok(())
    }
}

/// Collects formatted `tracing` output for assertions on log lines.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Routes events on the current thread here until the guard drops.
    /// Works with the default current-thread `#[tokio::test]` runtime.
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.lines().into_iter().filter(|line| line.contains(needle)).collect()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
