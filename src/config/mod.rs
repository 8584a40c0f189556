// dbsnapshot/src/config/mod.rs
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CREDENTIALS_FILE: &str = "/credentials/store.json";
const DEFAULT_DUMP_PROGRAM: &str = "mysqldump";
const DEFAULT_BACKUP_DIR: &str = "./backups";
/// Longest accepted interval or stage timeout.
const MAX_DURATION: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Connection parameters handed to the dump utility.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// Program plus leading arguments used to produce a dump. The connection
/// arguments are appended after these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DumpCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Splits a command line on whitespace. No quoting is supported.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .context("DUMP_COMMAND cannot be empty")?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Default for DumpCommand {
    fn default() -> Self {
        Self::new(DEFAULT_DUMP_PROGRAM)
    }
}

/// Everything a backup cycle needs. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct BackupCycleConfig {
    pub database: DatabaseConfig,
    pub destination_folder: String,
    pub artifact_prefix: String,
    pub interval: Duration,
    pub credentials_path: PathBuf,
    pub dump_command: DumpCommand,
    pub local_backup_dir: PathBuf,
    pub dump_timeout: Option<Duration>,
    pub upload_timeout: Option<Duration>,
    pub keep_local_artifacts: bool,
}

impl BackupCycleConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!("Loaded environment overrides from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("Environment variable {} is not set", key))
        };
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database = DatabaseConfig {
            host: required("MYSQL_HOST")?,
            user: required("MYSQL_USER")?,
            password: required("MYSQL_PASSWORD")?,
            name: required("MYSQL_DB")?,
        };

        let frequency = required("BACKUP_FREQUENCY")?;
        let interval = parse_duration("BACKUP_FREQUENCY", &frequency)?;

        let credentials_path = PathBuf::from(
            optional("STORE_CREDENTIALS_FILE").unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string()),
        );
        ensure_credentials_file(&credentials_path)?;

        let dump_command = match optional("DUMP_COMMAND") {
            Some(command_line) => DumpCommand::parse(&command_line)?,
            None => DumpCommand::default(),
        };

        let dump_timeout = optional("DUMP_TIMEOUT")
            .map(|value| parse_duration("DUMP_TIMEOUT", &value))
            .transpose()?;
        let upload_timeout = optional("UPLOAD_TIMEOUT")
            .map(|value| parse_duration("UPLOAD_TIMEOUT", &value))
            .transpose()?;

        let keep_local_artifacts = match optional("KEEP_LOCAL_ARTIFACTS") {
            Some(value) => parse_bool("KEEP_LOCAL_ARTIFACTS", &value)?,
            None => false,
        };

        let config = BackupCycleConfig {
            database,
            destination_folder: required("BACKUP_FOLDER_ID")?,
            artifact_prefix: required("BACKUP_FILE_PREFIX")?,
            interval,
            credentials_path,
            dump_command,
            local_backup_dir: PathBuf::from(
                optional("LOCAL_BACKUP_DIR").unwrap_or_else(|| DEFAULT_BACKUP_DIR.to_string()),
            ),
            dump_timeout,
            upload_timeout,
            keep_local_artifacts,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants every component relies on.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("database host", &self.database.host),
            ("database user", &self.database.user),
            ("database password", &self.database.password),
            ("database name", &self.database.name),
            ("destination folder", &self.destination_folder),
            ("artifact prefix", &self.artifact_prefix),
            ("dump program", &self.dump_command.program),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            anyhow::bail!("{} cannot be empty", field);
        }
        if self.interval.is_zero() {
            anyhow::bail!("Backup interval must be strictly positive");
        }
        if self.dump_timeout.is_some_and(|t| t.is_zero()) || self.upload_timeout.is_some_and(|t| t.is_zero()) {
            anyhow::bail!("Stage timeouts must be strictly positive when set");
        }
        let durations = [
            ("Backup interval", Some(self.interval)),
            ("Dump timeout", self.dump_timeout),
            ("Upload timeout", self.upload_timeout),
        ];
        if let Some((what, _)) = durations.iter().find(|(_, d)| d.is_some_and(|d| d > MAX_DURATION)) {
            anyhow::bail!(
                "{} cannot exceed {}",
                what,
                humantime::format_duration(MAX_DURATION)
            );
        }
        Ok(())
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim())
        .with_context(|| format!("Error parsing {}: {:?}", key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(anyhow::anyhow!("{} must be true or false, got {:?}", key, other)),
    }
}

fn ensure_credentials_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("Credentials file does not exist: {}", path.display());
    }
    Ok(())
}
