use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The two sequential operations of a backup cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dump,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Dump => f.write_str("dump"),
            Stage::Upload => f.write_str("upload"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to create artifact file {}: {source}", .path.display())]
    ArtifactCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dump of database {database} failed: {reason}")]
    DumpExecution { database: String, reason: String },

    #[error("Could not connect to artifact store: {0}")]
    StoreConnection(String),

    #[error("Failed to read artifact {}: {reason}", .path.display())]
    ArtifactRead { path: PathBuf, reason: String },

    #[error("Upload of {name} failed: {reason}")]
    UploadTransfer { name: String, reason: String },
}

impl BackupError {
    /// Stage of the cycle this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            BackupError::ArtifactCreation { .. } | BackupError::DumpExecution { .. } => Stage::Dump,
            BackupError::StoreConnection(_)
            | BackupError::ArtifactRead { .. }
            | BackupError::UploadTransfer { .. } => Stage::Upload,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
