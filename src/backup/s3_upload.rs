// dbsnapshot/src/backup/s3_upload.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use serde::Deserialize;
use std::path::Path;
use tokio::fs::File;
use tracing::debug;
use url::Url;

use crate::backup::store::{StoreConnector, StoreSession};
use crate::errors::{BackupError, Result};

/// Contents of the credentials file for an S3-compatible store
/// (AWS, DigitalOcean Spaces, MinIO...).
#[derive(Debug, Clone, Deserialize)]
pub struct S3Credentials {
    pub bucket_name: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl S3Credentials {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            BackupError::StoreConnection(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&raw).map_err(|reason| {
            BackupError::StoreConnection(format!("invalid credentials file {}: {}", path.display(), reason))
        })
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        let credentials: S3Credentials = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        let required = [
            ("bucket_name", &credentials.bucket_name),
            ("region", &credentials.region),
            ("access_key_id", &credentials.access_key_id),
            ("secret_access_key", &credentials.secret_access_key),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(format!("{} cannot be empty", field));
        }
        if let Some(endpoint) = &credentials.endpoint_url {
            Url::parse(endpoint).map_err(|e| format!("invalid endpoint_url {:?}: {}", endpoint, e))?;
        }
        Ok(credentials)
    }
}

/// Remote key of `name` inside `folder`.
pub fn object_key(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

/// Connects to an S3-compatible bucket described by a credentials file.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Connector;

#[async_trait]
impl StoreConnector for S3Connector {
    async fn connect(&self, credentials: &Path) -> Result<Box<dyn StoreSession>> {
        let credentials = S3Credentials::load(credentials).await?;

        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(s3::config::Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None, // session_token
                None, // expiry
                "Static", // provider_name
            ));
        if let Some(endpoint) = &credentials.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        let client = s3::Client::new(&sdk_config);

        // HeadBucket proves the keys are accepted and the bucket is reachable.
        client
            .head_bucket()
            .bucket(&credentials.bucket_name)
            .send()
            .await
            .map_err(|e| {
                BackupError::StoreConnection(format!(
                    "bucket {} is not accessible: {}",
                    credentials.bucket_name,
                    DisplayErrorContext(&e)
                ))
            })?;
        debug!("✓ Target bucket {} is accessible.", credentials.bucket_name);

        Ok(Box::new(S3Session {
            client,
            bucket: credentials.bucket_name,
        }))
    }
}

struct S3Session {
    client: s3::Client,
    bucket: String,
}

#[async_trait]
impl StoreSession for S3Session {
    async fn create_artifact(&self, folder: &str, name: &str, content: File) -> Result<()> {
        let transfer_failed = |reason: String| BackupError::UploadTransfer {
            name: name.to_string(),
            reason,
        };
        let key = object_key(folder, name);

        let body = ByteStream::read_from()
            .file(content)
            .build()
            .await
            .map_err(|e| transfer_failed(format!("failed to stream local artifact: {}", e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/sql")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                transfer_failed(format!(
                    "PutObject s3://{}/{} failed: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}
