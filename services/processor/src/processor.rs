use crate::classifier::classify;
use crate::event::{NotificationRecord, RecordError, S3EventRecord, S3_EVENT_SOURCE};
use crate::metadata_store::{MetadataRecord, MetadataTable, PersistenceError};
use crate::object_store::{ObjectStore, StoreError};
use crate::processing::{process, ProcessingOutcome};
use chrono::Utc;
use serde::Serialize;
use std::str::Utf8Error;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Identifier reported for failures whose record carries no key
pub const UNKNOWN_RECORD: &str = "unknown";

/// Errors that fail a single record
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Invalid notification record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("Object not found: s3://{bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Object store unavailable: {0}")]
    TransientStore(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Object is not valid UTF-8 text: {0}")]
    Decode(#[from] Utf8Error),
}

impl From<StoreError> for ProcessorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { bucket, key } => ProcessorError::ObjectNotFound { bucket, key },
            StoreError::Transient(message) => ProcessorError::TransientStore(message),
        }
    }
}

/// Decision taken before a record enters the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Run the pipeline for this record
    Process(NotificationRecord),
    /// Ignore the record without reporting it
    Skip { reason: &'static str },
}

/// What the processing step produced for one object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    /// Length reported by the download
    pub original_size: Option<i64>,
    pub content_type: Option<String>,
    pub processing_result: ProcessingOutcome,
}

/// Result entry for a record that went through the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEntry {
    pub key: String,
    pub status: &'static str,
    pub size: Option<i64>,
    pub content_type: Option<String>,
    pub processing_result: FileReport,
}

/// Result entry for a record that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    /// Raw object key, or `"unknown"`
    pub record: String,
    pub error: String,
}

/// Exactly one of these is produced per notification record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Success(SuccessEntry),
    Failure(FailureEntry),
    Skipped,
}

/// Runs one notification record through fetch, classify, process and persist
pub struct RecordProcessor {
    store: Arc<dyn ObjectStore>,
    table: Arc<dyn MetadataTable>,
    processed_prefix: String,
}

impl RecordProcessor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        table: Arc<dyn MetadataTable>,
        processed_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            table,
            processed_prefix: processed_prefix.into(),
        }
    }

    /// Key under which a processed copy of `key` would be written
    pub fn processed_key(&self, key: &str) -> String {
        format!("{}{}", self.processed_prefix, key)
    }

    /// Decide whether a raw record enters the pipeline
    ///
    /// Skips non-S3 sources, keys already under the processed prefix
    /// (self-triggered re-uploads) and removal events, in that order.
    pub fn admit(&self, raw: &S3EventRecord) -> Result<Admission, ProcessorError> {
        if raw.source() != S3_EVENT_SOURCE {
            return Ok(Admission::Skip {
                reason: "not an S3 event",
            });
        }

        // the prefix check only needs the key
        if raw.decoded_key()?.starts_with(&self.processed_prefix) {
            return Ok(Admission::Skip {
                reason: "already processed",
            });
        }

        let record = NotificationRecord::try_from(raw)?;

        if record.is_removal() {
            return Ok(Admission::Skip {
                reason: "removal event",
            });
        }

        Ok(Admission::Process(record))
    }

    /// Process one raw record, converting any error into a failure entry
    #[instrument(skip(self, raw), fields(key = raw.raw_key().unwrap_or(UNKNOWN_RECORD)))]
    pub async fn process(&self, raw: &S3EventRecord) -> RecordOutcome {
        let result = match self.admit(raw) {
            Ok(Admission::Skip { reason }) => {
                debug!(
                    event_source = raw.source(),
                    reason = reason,
                    "Skipping record"
                );
                metrics::counter!("processor.records.skipped").increment(1);
                return RecordOutcome::Skipped;
            }
            Ok(Admission::Process(record)) => self.run(&record).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(entry) => {
                metrics::counter!("processor.records.processed").increment(1);
                info!(key = %entry.key, "Successfully processed object");
                RecordOutcome::Success(entry)
            }
            Err(e) => {
                metrics::counter!("processor.records.failed").increment(1);
                error!(error = %e, "Error processing record");
                RecordOutcome::Failure(FailureEntry {
                    record: raw.raw_key().unwrap_or(UNKNOWN_RECORD).to_string(),
                    error: e.to_string(),
                })
            }
        }
    }

    /// Fetch metadata, download, classify, process and persist
    async fn run(&self, record: &NotificationRecord) -> Result<SuccessEntry, ProcessorError> {
        info!(
            bucket = %record.bucket,
            key = %record.key,
            event_name = %record.event_name,
            size = ?record.size,
            "Processing object"
        );

        let object = self.store.head_object(&record.bucket, &record.key).await?;
        let content_type = object.content_type.clone();

        let body = self.store.get_object(&record.bucket, &record.key).await?;
        metrics::counter!("processor.bytes.downloaded").increment(body.bytes.len() as u64);

        let mode = classify(content_type.as_deref());
        debug!(content_type = ?content_type, mode = ?mode, "Classified object");

        let outcome = process(mode, &body.bytes, content_type.as_deref())?;

        let row = MetadataRecord::build(record, &object, &outcome, Utc::now())?;
        self.table.put_item(&row).await?;
        debug!(id = %row.id, "Metadata stored");

        Ok(SuccessEntry {
            key: record.key.clone(),
            status: "success",
            size: record.size,
            content_type: content_type.clone(),
            processing_result: FileReport {
                original_size: body.content_length,
                content_type,
                processing_result: outcome,
            },
        })
    }
}
