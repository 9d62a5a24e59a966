use crate::config::Config;
use crate::event::NotificationRecord;
use crate::object_store::ObjectMetadata;
use crate::processing::ProcessingOutcome;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::config::Builder as DynamoConfigBuilder;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Status written for every record this service stores
pub const STATUS_PROCESSED: &str = "processed";

/// Errors raised while persisting metadata
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to encode metadata record: {0}")]
    Encode(String),

    #[error("Failed to write metadata record to {table}: {message}")]
    Write { table: String, message: String },
}

/// Row stored in the metadata table, keyed by object key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    /// Object key
    pub id: String,
    pub bucket: String,
    /// Last path segment of the key
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// ISO-8601 time at which processing finished
    pub processed_at: String,
    /// Time reported by the triggering notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    pub status: String,
    /// JSON object: user metadata merged with the processing outcome
    pub metadata: String,
}

impl MetadataRecord {
    /// Build the row for a processed object
    pub fn build(
        record: &NotificationRecord,
        object: &ObjectMetadata,
        outcome: &ProcessingOutcome,
        processed_at: DateTime<Utc>,
    ) -> Result<Self, PersistenceError> {
        let fields = outcome
            .to_fields()
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;
        let merged = merge_metadata(&object.metadata, fields);
        let metadata = serde_json::to_string(&merged)
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;

        Ok(Self {
            id: record.key.clone(),
            bucket: record.bucket.clone(),
            filename: record.filename().to_string(),
            content_type: object.content_type.clone(),
            size: record.size,
            processed_at: processed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            event_time: record.event_time.clone(),
            status: STATUS_PROCESSED.to_string(),
            metadata,
        })
    }

    /// Decode the stored custom metadata blob
    pub fn custom_metadata(&self) -> Result<Map<String, Value>, serde_json::Error> {
        serde_json::from_str(&self.metadata)
    }
}

/// Merge user metadata with outcome fields; outcome keys win on collision
pub fn merge_metadata(user: &HashMap<String, String>, outcome: Map<String, Value>) -> Map<String, Value> {
    let mut merged: Map<String, Value> = user
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    merged.extend(outcome);
    merged
}

/// Key-value table holding one metadata record per object
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataTable: Send + Sync {
    /// Insert or overwrite the record with the same id
    async fn put_item(&self, record: &MetadataRecord) -> Result<(), PersistenceError>;
}

/// [`MetadataTable`] backed by DynamoDB
pub struct DynamoMetadataTable {
    client: DynamoClient,
    table: String,
}

impl DynamoMetadataTable {
    /// Create a new DynamoDB-backed table from the shared AWS configuration
    pub fn new(aws_config: &SdkConfig, config: &Config) -> Self {
        let mut builder = DynamoConfigBuilder::from(aws_config);

        // Configure custom endpoint for LocalStack/DynamoDB Local
        if let Some(ref endpoint_url) = config.dynamodb_endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        let client = DynamoClient::from_conf(builder.build());

        info!(table = %config.metadata_table, "DynamoDB metadata table initialized");

        Self {
            client,
            table: config.metadata_table.clone(),
        }
    }
}

#[async_trait]
impl MetadataTable for DynamoMetadataTable {
    #[instrument(skip(self, record), fields(table = %self.table, id = %record.id))]
    async fn put_item(&self, record: &MetadataRecord) -> Result<(), PersistenceError> {
        let item: HashMap<String, AttributeValue> = serde_dynamo::to_item(record)
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| PersistenceError::Write {
                table: self.table.clone(),
                message: e.to_string(),
            })?;

        debug!("Metadata record stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_record() -> NotificationRecord {
        NotificationRecord {
            event_source: "aws:s3".to_string(),
            event_name: "ObjectCreated:Put".to_string(),
            event_time: Some("2024-01-15T10:30:00.000Z".to_string()),
            bucket: "test-bucket".to_string(),
            key: "uploads/2024/report.json".to_string(),
            size: Some(2),
        }
    }

    #[test]
    fn test_merge_outcome_overrides_user_metadata() {
        let user = HashMap::from([
            ("a".to_string(), "1".to_string()),
            ("isJson".to_string(), "maybe".to_string()),
        ]);
        let outcome = serde_json::json!({ "b": 2, "isJson": true });
        let Value::Object(outcome) = outcome else {
            unreachable!()
        };

        let merged = merge_metadata(&user, outcome);
        assert_eq!(
            Value::Object(merged),
            serde_json::json!({ "a": "1", "b": 2, "isJson": true })
        );
    }

    #[test]
    fn test_build_metadata_record() {
        let object = ObjectMetadata {
            content_type: Some("application/json".to_string()),
            content_length: Some(2),
            metadata: HashMap::from([("owner".to_string(), "alice".to_string())]),
            ..Default::default()
        };
        let outcome = ProcessingOutcome::Unsupported;
        let processed_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 31, 0).unwrap();

        let row = MetadataRecord::build(&create_test_record(), &object, &outcome, processed_at).unwrap();

        assert_eq!(row.id, "uploads/2024/report.json");
        assert_eq!(row.filename, "report.json");
        assert_eq!(row.status, "processed");
        assert_eq!(row.processed_at, "2024-01-15T10:31:00.000Z");
        assert_eq!(row.size, Some(2));
        assert_eq!(
            Value::Object(row.custom_metadata().unwrap()),
            serde_json::json!({ "owner": "alice", "type": "unsupported" })
        );
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let object = ObjectMetadata::default();
        let row = MetadataRecord::build(
            &create_test_record(),
            &object,
            &ProcessingOutcome::Unsupported,
            Utc::now(),
        )
        .unwrap();

        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("processedAt").is_some());
        assert_eq!(value["eventTime"], "2024-01-15T10:30:00.000Z");
        assert!(value.get("contentType").is_none());
    }

    #[test]
    fn test_record_encodes_as_dynamo_item() {
        let row = MetadataRecord::build(
            &create_test_record(),
            &ObjectMetadata::default(),
            &ProcessingOutcome::Unsupported,
            Utc::now(),
        )
        .unwrap();

        let item: HashMap<String, AttributeValue> = serde_dynamo::to_item(&row).unwrap();
        assert_eq!(
            item.get("id"),
            Some(&AttributeValue::S("uploads/2024/report.json".to_string()))
        );
        assert_eq!(item.get("size"), Some(&AttributeValue::N("2".to_string())));
        assert_eq!(
            item.get("status"),
            Some(&AttributeValue::S("processed".to_string()))
        );
    }
}
