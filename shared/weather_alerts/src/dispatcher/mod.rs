//! Weather alert dispatch using SNS
//!
//! A snapshot raises at most one alert. Dispatching is independent of snapshot
//! storage: a failed publish leaves stored data untouched.

mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod topic;

use std::sync::Arc;

use common_types::{Coordinates, WeatherConfig};
use serde_json::Value;

pub use error::{AlertError, AlertResult};
pub use topic::{NotificationBackend, SubscriptionStatus, TopicSubscription, EMAIL_PROTOCOL};

use crate::rules::{Readings, WeatherAlert};

/// Result of [`WeatherAlertDispatcher::evaluate_and_alert`]
#[derive(Debug, Clone, PartialEq)]
pub enum AlertOutcome {
    /// A rule matched and the alert was published
    Sent {
        /// Matched rule
        alert: WeatherAlert,
        /// Published message body
        message: String,
        /// Message id reported by SNS
        message_id: Option<String>,
    },
    /// No rule matched, nothing was published
    NoAlert,
}

/// Publishes weather alerts and manages subscriptions of the alert topic
pub struct WeatherAlertDispatcher {
    backend: Arc<dyn NotificationBackend>,
    topic_arn: Option<String>,
    topic_name: String,
}

impl WeatherAlertDispatcher {
    /// Creates a new alert dispatcher
    ///
    /// # Arguments
    ///
    /// * `backend` - Pre-configured SNS client (or any other [`NotificationBackend`])
    /// * `topic_arn` - Existing topic to use as-is; topic creation is skipped when set
    /// * `topic_name` - Topic created when `topic_arn` is `None`
    #[must_use]
    pub fn new(
        backend: Arc<dyn NotificationBackend>,
        topic_arn: Option<String>,
        topic_name: String,
    ) -> Self {
        Self {
            backend,
            topic_arn,
            topic_name,
        }
    }

    /// Creates a dispatcher using the topic settings from `config`
    #[must_use]
    pub fn from_config(backend: Arc<dyn NotificationBackend>, config: &WeatherConfig) -> Self {
        Self::new(backend, config.topic_arn.clone(), config.topic_name.clone())
    }

    /// Returns the configured topic ARN, or creates the topic `name`
    ///
    /// Topic creation is idempotent on SNS, so repeated calls return the same ARN.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::BackendUnavailable` if the topic cannot be created
    pub async fn ensure_topic(&self, name: &str) -> AlertResult<String> {
        if let Some(topic_arn) = &self.topic_arn {
            tracing::debug!(topic_arn = %topic_arn, "Using configured SNS topic");
            return Ok(topic_arn.clone());
        }

        let topic_arn = self
            .backend
            .create_named_topic(name)
            .await
            .inspect_err(|e| tracing::error!(topic = name, error = %e, "Error creating SNS topic"))?;

        tracing::info!(topic = name, topic_arn = %topic_arn, "SNS topic ready");
        Ok(topic_arn)
    }

    async fn alert_topic(&self) -> AlertResult<String> {
        self.ensure_topic(&self.topic_name).await
    }

    /// Evaluates a snapshot and publishes an alert when a threshold is crossed
    ///
    /// # Arguments
    ///
    /// * `city` - City display name used in the message
    /// * `coordinates` - Location of the observation
    /// * `snapshot` - Upstream weather payload with `main.temp`, `wind.speed` and
    ///   `weather[0].main`
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidSnapshot` if a required field is missing,
    /// `AlertError::BackendUnavailable` if the topic cannot be resolved and
    /// `AlertError::NotificationFailed` if SNS rejects the message
    pub async fn evaluate_and_alert(
        &self,
        city: &str,
        coordinates: Coordinates,
        snapshot: &Value,
    ) -> AlertResult<AlertOutcome> {
        let readings = Readings::from_snapshot(snapshot)
            .inspect_err(|e| tracing::error!(city, error = %e, "Cannot evaluate weather snapshot"))?;

        let Some(alert) = readings.evaluate() else {
            tracing::info!(city, %coordinates, "No severe weather detected, no alert sent");
            return Ok(AlertOutcome::NoAlert);
        };

        let topic_arn = self.alert_topic().await?;
        let message = alert.message(city);

        let message_id = self
            .backend
            .publish_message(&topic_arn, &WeatherAlert::subject(city), &message)
            .await
            .inspect_err(|e| {
                tracing::error!(city, %coordinates, error = %e, "Failed to send alert");
            })?;

        tracing::info!(city, %coordinates, message = %message, "Alert sent");
        Ok(AlertOutcome::Sent {
            alert,
            message,
            message_id,
        })
    }

    /// Subscribes an email address to the alert topic
    ///
    /// The address is only validated by SNS. Email subscriptions stay pending until
    /// the recipient confirms.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::SubscriptionFailed` if SNS rejects the request and
    /// `AlertError::BackendUnavailable` if SNS cannot be reached
    pub async fn subscribe(&self, email: &str) -> AlertResult<SubscriptionStatus> {
        let topic_arn = self.alert_topic().await?;

        let subscription_arn = self
            .backend
            .subscribe_email(&topic_arn, email)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error subscribing user"))?;

        let status = SubscriptionStatus::from_arn(subscription_arn.as_deref());
        tracing::info!(?status, "Subscription request sent, user must confirm subscription");
        Ok(status)
    }

    /// Lists all subscriptions of the alert topic
    ///
    /// # Errors
    ///
    /// Returns `AlertError::SubscriptionFailed` if SNS rejects the request and
    /// `AlertError::BackendUnavailable` if SNS cannot be reached
    pub async fn list_subscriptions(&self) -> AlertResult<Vec<TopicSubscription>> {
        let topic_arn = self.alert_topic().await?;

        let subscriptions = self
            .backend
            .list_topic_subscriptions(&topic_arn)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error listing subscriptions"))?;

        if subscriptions.is_empty() {
            tracing::info!(topic_arn = %topic_arn, "No subscriptions found for the SNS topic");
        }
        Ok(subscriptions)
    }
}
