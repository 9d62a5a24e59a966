use anyhow::Context;
use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use upload_processor::{
    function_handler, BatchHandler, Config, DynamoMetadataTable, RecordProcessor,
    S3NotificationEvent, S3ObjectStore,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.log_level);

    info!(
        table = %config.metadata_table,
        processed_prefix = %config.processed_prefix,
        record_concurrency = config.record_concurrency,
        "Starting upload processor"
    );

    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;

    let store = Arc::new(S3ObjectStore::new(&aws_config, &config));
    let table = Arc::new(DynamoMetadataTable::new(&aws_config, &config));
    let processor = Arc::new(RecordProcessor::new(
        store,
        table,
        config.processed_prefix.clone(),
    ));
    let handler = Arc::new(BatchHandler::new(processor, config.record_concurrency));

    run(service_fn(move |event: LambdaEvent<S3NotificationEvent>| {
        let handler = handler.clone();
        async move { function_handler(&handler, event).await }
    }))
    .await
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().without_time())
        .init();
}
