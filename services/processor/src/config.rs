use serde::Deserialize;

/// Main configuration for the upload processor
///
/// Keys are flat so that the Lambda environment (`METADATA_TABLE`,
/// `PROCESSED_PREFIX`, ...) maps onto fields directly.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// DynamoDB table receiving one metadata record per processed object
    #[serde(default = "default_metadata_table")]
    pub metadata_table: String,
    /// Key prefix marking objects that were already processed
    #[serde(default = "default_processed_prefix")]
    pub processed_prefix: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub aws_region: String,
    /// Custom S3 endpoint URL (for MinIO, LocalStack, etc.)
    pub s3_endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub s3_force_path_style: bool,
    /// Custom DynamoDB endpoint URL (for LocalStack, DynamoDB Local)
    pub dynamodb_endpoint_url: Option<String>,
    /// Records processed concurrently within one invocation (1 = sequential)
    #[serde(default = "default_record_concurrency")]
    pub record_concurrency: usize,
}

// Default value functions
fn default_metadata_table() -> String {
    "file-metadata".to_string()
}

fn default_processed_prefix() -> String {
    "processed/".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_record_concurrency() -> usize {
    1
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Add config file if present
            .add_source(config::File::with_name("config/processor").required(false))
            // Override with environment variables
            // METADATA_TABLE -> metadata_table
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.metadata_table.trim().is_empty() {
            anyhow::bail!("METADATA_TABLE must not be empty");
        }
        if self.record_concurrency == 0 {
            anyhow::bail!("RECORD_CONCURRENCY must be at least 1");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata_table: default_metadata_table(),
            processed_prefix: default_processed_prefix(),
            log_level: default_log_level(),
            aws_region: default_region(),
            s3_endpoint_url: None,
            s3_force_path_style: false,
            dynamodb_endpoint_url: None,
            record_concurrency: default_record_concurrency(),
        }
    }
}
