use crate::config::Config;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Errors returned by the object store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Object store request failed: {0}")]
    Transient(String),
}

/// Header metadata of a stored object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub e_tag: Option<String>,
    /// User-supplied `x-amz-meta-*` pairs
    pub metadata: HashMap<String, String>,
}

/// Full object contents
#[derive(Debug, Clone, Default)]
pub struct ObjectBody {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
}

/// Read/write access to objects by bucket and key
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch header metadata without the body
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, StoreError>;

    /// Download the object body
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, StoreError>;

    /// Upload an object
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Result<(), StoreError>;
}

/// [`ObjectStore`] backed by Amazon S3 (or an S3-compatible endpoint)
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    /// Create a new S3 object store from the shared AWS configuration
    pub fn new(aws_config: &SdkConfig, config: &Config) -> Self {
        let mut s3_config_builder = S3ConfigBuilder::from(aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.s3_endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.s3_force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            endpoint = ?config.s3_endpoint_url,
            force_path_style = config.s3_force_path_style,
            "S3 object store initialized"
        );

        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, StoreError> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    not_found(bucket, key)
                } else {
                    StoreError::Transient(format!("head_object failed: {e}"))
                }
            })?;

        let metadata = ObjectMetadata {
            content_type: response.content_type().map(String::from),
            content_length: response.content_length(),
            last_modified: response
                .last_modified()
                .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
            e_tag: response.e_tag().map(String::from),
            metadata: response.metadata().cloned().unwrap_or_default(),
        };

        debug!(
            content_type = ?metadata.content_type,
            content_length = ?metadata.content_length,
            e_tag = ?metadata.e_tag,
            "Fetched object metadata"
        );

        Ok(metadata)
    }

    #[instrument(skip(self))]
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    not_found(bucket, key)
                } else {
                    StoreError::Transient(format!("get_object failed: {e}"))
                }
            })?;

        let content_type = response.content_type().map(String::from);
        let content_length = response.content_length();

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Transient(format!("failed to read object body: {e}")))?
            .into_bytes();

        debug!(size_bytes = bytes.len(), "Downloaded object");

        Ok(ObjectBody {
            bytes,
            content_type,
            content_length,
        })
    }

    #[instrument(skip(self, body, metadata), fields(size_bytes = body.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| StoreError::Transient(format!("put_object failed: {e}")))?;

        debug!("Object uploaded");
        Ok(())
    }
}

fn not_found(bucket: &str, key: &str) -> StoreError {
    StoreError::NotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
    }
}
