//! Upload Processor
//!
//! Event-triggered service for the Nier platform. It reacts to S3 upload
//! notifications, downloads each new object, inspects its content and indexes
//! a metadata record in DynamoDB.
//!
//! ## Features
//!
//! - **Notification Gate**: ignores non-S3 sources, removal events and objects
//!   already under the processed prefix
//! - **Content Inspection**: image objects are measured, text and JSON objects
//!   get line/word/character statistics and a JSON validity flag
//! - **Metadata Indexing**: one DynamoDB row per object, merging the object's
//!   user metadata with the inspection outcome
//! - **Failure Isolation**: a failing record is reported in the response
//!   without aborting the rest of the batch
//!
//! ## Architecture
//!
//! ```text
//! S3 Notification            S3 Bucket                 DynamoDB
//! ┌──────────────┐           ┌──────────────┐          ┌──────────────┐
//! │ Records[]    │           │ HEAD / GET   │          │ file-        │
//! └──────────────┘           └──────────────┘          │ metadata     │
//!        │                          ▲                  └──────────────┘
//!        ▼                          │                         ▲
//! ┌──────────────┐           ┌──────────────┐                 │
//! │ Batch        │──────────▶│ Record       │─────────────────┘
//! │ Handler      │           │ Processor    │
//! └──────────────┘           └──────────────┘
//!                                   │
//!                                   ▼
//!                            ┌──────────────┐
//!                            │ Classifier / │
//!                            │ Processing   │
//!                            └──────────────┘
//! ```

pub mod classifier;
pub mod config;
pub mod event;
pub mod handler;
pub mod metadata_store;
pub mod object_store;
pub mod processing;
pub mod processor;

pub use classifier::{classify, ProcessingMode};
pub use config::Config;
pub use event::{NotificationRecord, S3EventRecord, S3NotificationEvent};
pub use handler::{function_handler, BatchHandler, BatchResult, InvocationResponse};
pub use metadata_store::{DynamoMetadataTable, MetadataRecord, MetadataTable, PersistenceError};
pub use object_store::{ObjectBody, ObjectMetadata, ObjectStore, S3ObjectStore, StoreError};
pub use processing::{ImageSummary, ProcessingOutcome, TextSummary};
pub use processor::{FailureEntry, ProcessorError, RecordOutcome, RecordProcessor, SuccessEntry};
