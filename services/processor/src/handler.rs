use crate::event::S3NotificationEvent;
use crate::processor::{FailureEntry, RecordOutcome, RecordProcessor, SuccessEntry};
use futures::stream::{self, StreamExt};
use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Aggregated per-record results of one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub results: Vec<SuccessEntry>,
    pub errors: Vec<FailureEntry>,
}

impl BatchResult {
    /// 200 when nothing failed, 207 otherwise
    pub fn status_code(&self) -> u16 {
        if self.errors.is_empty() {
            200
        } else {
            207
        }
    }

    fn push(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Success(entry) => self.results.push(entry),
            RecordOutcome::Failure(entry) => self.errors.push(entry),
            RecordOutcome::Skipped => {}
        }
    }

    pub fn into_response(self) -> InvocationResponse {
        let status_code = self.status_code();
        InvocationResponse {
            status_code,
            body: ResponseBody {
                message: "Processing complete".to_string(),
                processed: self.results.len(),
                results: self.results,
                errors: if self.errors.is_empty() {
                    None
                } else {
                    Some(self.errors)
                },
            },
        }
    }
}

/// Value returned to the Lambda runtime
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseBody {
    pub message: String,
    /// Number of successfully processed records
    pub processed: usize,
    pub results: Vec<SuccessEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FailureEntry>>,
}

/// Runs every record of an event through the [`RecordProcessor`]
pub struct BatchHandler {
    processor: Arc<RecordProcessor>,
    concurrency: usize,
}

impl BatchHandler {
    /// `concurrency` of 1 processes records strictly one after another
    pub fn new(processor: Arc<RecordProcessor>, concurrency: usize) -> Self {
        Self {
            processor,
            concurrency: concurrency.max(1),
        }
    }

    /// Process all records; failures are collected, never propagated
    #[instrument(skip(self, event), fields(record_count = event.records.len()))]
    pub async fn handle(&self, event: &S3NotificationEvent) -> BatchResult {
        // `buffered` keeps input order in the output
        let outcomes: Vec<RecordOutcome> = stream::iter(event.records.iter())
            .map(|record| self.processor.process(record))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut batch = BatchResult::default();
        for outcome in outcomes {
            batch.push(outcome);
        }
        batch
    }
}

/// Lambda entry for one invocation
#[instrument(skip_all, fields(request_id = %event.context.request_id))]
pub async fn function_handler(
    handler: &BatchHandler,
    event: LambdaEvent<S3NotificationEvent>,
) -> Result<InvocationResponse, Error> {
    info!(
        function_arn = %event.context.invoked_function_arn,
        record_count = event.payload.records.len(),
        "Received event"
    );

    let batch = handler.handle(&event.payload).await;
    let response = batch.into_response();

    info!(
        status_code = response.status_code,
        processed = response.body.processed,
        errors = response.body.errors.as_ref().map_or(0, Vec::len),
        "Processing complete"
    );

    Ok(response)
}
