//! Weather service configuration
//!
//! Built once by the caller and handed to the record store and the alert dispatcher.

use std::env;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use thiserror::Error;

use crate::environment::Environment;

/// Default DynamoDB table holding weather snapshots
pub const DEFAULT_TABLE_NAME: &str = "WeatherData";
/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";
/// Default SNS topic name used when no topic ARN is configured
pub const DEFAULT_TOPIC_NAME: &str = "WeatherAlerts";
/// Default wait for a new table to become active
pub const DEFAULT_TABLE_READY_TIMEOUT: Duration = Duration::from_secs(300);
/// Default delay between table status checks
pub const DEFAULT_TABLE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Errors raised while reading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `APP_ENV` holds an unknown stage
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),
}

/// Configuration for the weather record store and alert dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherConfig {
    /// Deployment stage
    pub environment: Environment,
    /// DynamoDB table name
    pub table_name: String,
    /// AWS region
    pub region: String,
    /// Pre-existing SNS topic; when set no topic is created
    pub topic_arn: Option<String>,
    /// Name of the topic created when `topic_arn` is unset
    pub topic_name: String,
    /// Endpoint override for AWS services
    pub endpoint_url: Option<String>,
    /// How long `ensure_schema` waits for a new table to become active
    pub table_ready_timeout: Duration,
    /// Delay between table status checks
    pub table_poll_interval: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

impl WeatherConfig {
    /// Default configuration for the given environment
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            region: DEFAULT_REGION.to_string(),
            topic_arn: None,
            topic_name: DEFAULT_TOPIC_NAME.to_string(),
            endpoint_url: environment
                .override_aws_endpoint_url()
                .map(ToString::to_string),
            table_ready_timeout: DEFAULT_TABLE_READY_TIMEOUT,
            table_poll_interval: DEFAULT_TABLE_POLL_INTERVAL,
        }
    }

    /// Reads the configuration from environment variables
    ///
    /// Recognised variables: `APP_ENV`, `TABLE_NAME`, `REGION`, `TOPIC_ARN`,
    /// `TOPIC_NAME`, `AWS_ENDPOINT_URL`, `TABLE_READY_TIMEOUT_SECS`.
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `APP_ENV` is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env()?;
        let defaults = Self::for_environment(environment);

        Ok(Self {
            environment,
            table_name: non_empty_var("TABLE_NAME").unwrap_or(defaults.table_name),
            region: non_empty_var("REGION").unwrap_or(defaults.region),
            topic_arn: non_empty_var("TOPIC_ARN"),
            topic_name: non_empty_var("TOPIC_NAME").unwrap_or(defaults.topic_name),
            endpoint_url: non_empty_var("AWS_ENDPOINT_URL").or(defaults.endpoint_url),
            table_ready_timeout: non_empty_var("TABLE_READY_TIMEOUT_SECS")
                .and_then(|val| val.parse::<u64>().ok())
                .map_or(defaults.table_ready_timeout, Duration::from_secs),
            table_poll_interval: defaults.table_poll_interval,
        })
    }

    /// Shared AWS SDK configuration for the configured region and endpoint
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));

        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url.clone());
        }

        loader.load().await
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
