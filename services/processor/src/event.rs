use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event source tag carried by object-storage notifications
pub const S3_EVENT_SOURCE: &str = "aws:s3";

/// Event name prefix for deletion notifications
pub const OBJECT_REMOVED_PREFIX: &str = "ObjectRemoved";

/// Trigger payload delivered by the Lambda runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3NotificationEvent {
    #[serde(rename = "Records")]
    pub records: Vec<S3EventRecord>,
}

/// One raw notification record as it arrives on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    pub event_source: Option<String>,
    pub event_name: Option<String>,
    pub event_time: Option<String>,
    #[serde(default)]
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: S3Bucket,
    #[serde(default)]
    pub object: S3Object,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Object {
    /// URL-encoded object key
    pub key: Option<String>,
    pub size: Option<i64>,
}

/// Errors raised while turning a raw record into a [`NotificationRecord`]
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Record is missing field: {0}")]
    MissingField(&'static str),

    #[error("Object key is not valid percent-encoding: {0}")]
    InvalidKey(String),
}

/// A decoded upload or removal notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub event_source: String,
    pub event_name: String,
    pub event_time: Option<String>,
    pub bucket: String,
    /// Decoded object key (`+` read as space, then percent-decoded)
    pub key: String,
    pub size: Option<i64>,
}

impl S3EventRecord {
    /// Event source tag, empty when absent
    pub fn source(&self) -> &str {
        self.event_source.as_deref().unwrap_or_default()
    }

    /// Raw (still encoded) object key, if the record carries one
    pub fn raw_key(&self) -> Option<&str> {
        self.s3.as_ref().and_then(|s3| s3.object.key.as_deref())
    }

    /// Object key with `+` and percent-escapes decoded
    pub fn decoded_key(&self) -> Result<String, RecordError> {
        let raw = self
            .raw_key()
            .ok_or(RecordError::MissingField("s3.object.key"))?;
        decode_object_key(raw)
    }
}

impl TryFrom<&S3EventRecord> for NotificationRecord {
    type Error = RecordError;

    fn try_from(record: &S3EventRecord) -> Result<Self, Self::Error> {
        let s3 = record.s3.as_ref().ok_or(RecordError::MissingField("s3"))?;
        let bucket = s3
            .bucket
            .name
            .clone()
            .ok_or(RecordError::MissingField("s3.bucket.name"))?;
        let raw_key = s3
            .object
            .key
            .as_deref()
            .ok_or(RecordError::MissingField("s3.object.key"))?;
        let event_name = record
            .event_name
            .clone()
            .ok_or(RecordError::MissingField("eventName"))?;

        Ok(Self {
            event_source: record.source().to_string(),
            event_name,
            event_time: record.event_time.clone(),
            bucket,
            key: decode_object_key(raw_key)?,
            size: s3.object.size,
        })
    }
}

impl NotificationRecord {
    /// Whether this notification reports a deletion
    pub fn is_removal(&self) -> bool {
        self.event_name.starts_with(OBJECT_REMOVED_PREFIX)
    }

    /// Last path segment of the key
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or_default()
    }
}

/// Decode an S3 notification key: `+` encodes a space, the rest is percent-encoding
pub fn decode_object_key(raw: &str) -> Result<String, RecordError> {
    check_percent_escapes(raw)?;
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| RecordError::InvalidKey(e.to_string()))
}

/// Every `%` must start a two-hex-digit escape
fn check_percent_escapes(raw: &str) -> Result<(), RecordError> {
    let bytes = raw.as_bytes();
    for (i, _) in raw.match_indices('%') {
        let escape = bytes.get(i + 1..i + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(RecordError::InvalidKey(format!(
                "malformed escape at byte {i} in {raw:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_notification_event() {
        let json = r#"{
            "Records": [{
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "us-east-1",
                "eventTime": "2024-01-15T10:30:00.000Z",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": "test-bucket", "arn": "arn:aws:s3:::test-bucket" },
                    "object": { "key": "uploads/my+report%282%29.json", "size": 1024, "eTag": "abc" }
                }
            }]
        }"#;

        let event: S3NotificationEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.records.len(), 1);

        let record = NotificationRecord::try_from(&event.records[0]).unwrap();
        assert_eq!(record.bucket, "test-bucket");
        assert_eq!(record.key, "uploads/my report(2).json");
        assert_eq!(record.filename(), "my report(2).json");
        assert_eq!(record.size, Some(1024));
        assert_eq!(record.event_time.as_deref(), Some("2024-01-15T10:30:00.000Z"));
        assert!(!record.is_removal());
    }

    #[test]
    fn test_decode_object_key() {
        assert_eq!(decode_object_key("a+b").unwrap(), "a b");
        assert_eq!(decode_object_key("a%2Bb").unwrap(), "a+b");
        assert_eq!(decode_object_key("caf%C3%A9.txt").unwrap(), "café.txt");
        assert!(decode_object_key("bad%FF%FE").is_err());
    }

    #[test]
    fn test_decode_rejects_malformed_escapes() {
        assert!(matches!(
            decode_object_key("a%zz.txt"),
            Err(RecordError::InvalidKey(_))
        ));
        assert!(matches!(decode_object_key("a%"), Err(RecordError::InvalidKey(_))));
        assert!(matches!(decode_object_key("a%4"), Err(RecordError::InvalidKey(_))));
        assert_eq!(decode_object_key("100%25.txt").unwrap(), "100%.txt");
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let record = S3EventRecord {
            event_source: Some(S3_EVENT_SOURCE.to_string()),
            event_name: Some("ObjectCreated:Put".to_string()),
            s3: Some(S3Entity {
                bucket: S3Bucket {
                    name: Some("bucket".to_string()),
                },
                object: S3Object::default(),
            }),
            ..Default::default()
        };

        assert!(record.raw_key().is_none());
        assert!(matches!(
            NotificationRecord::try_from(&record),
            Err(RecordError::MissingField("s3.object.key"))
        ));
    }

    #[test]
    fn test_removal_detection() {
        let record = NotificationRecord {
            event_source: S3_EVENT_SOURCE.to_string(),
            event_name: "ObjectRemoved:Delete".to_string(),
            event_time: None,
            bucket: "bucket".to_string(),
            key: "file.txt".to_string(),
            size: None,
        };
        assert!(record.is_removal());
        assert_eq!(record.filename(), "file.txt");
    }
}
