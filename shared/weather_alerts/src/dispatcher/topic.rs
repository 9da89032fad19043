//! SNS operations used by the alert dispatcher

use aws_sdk_sns::Client as SnsClient;
use serde::{Deserialize, Serialize};

use super::{AlertError, AlertResult};

/// Subscription protocol used for alert recipients
pub const EMAIL_PROTOCOL: &str = "email";

/// Subscription attached to the alert topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSubscription {
    /// Subscription ARN, or SNS's pending marker while unconfirmed
    pub subscription_arn: String,
    /// Delivery protocol, e.g. `email`
    pub protocol: String,
    /// Delivery endpoint, e.g. the email address
    pub endpoint: String,
    /// Account owning the subscription
    pub owner: Option<String>,
}

impl TopicSubscription {
    /// Confirmation state of the subscription
    #[must_use]
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_arn(Some(&self.subscription_arn))
    }
}

/// Confirmation state returned by a subscribe request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    /// The recipient has not confirmed yet
    PendingConfirmation,
    /// Confirmed subscription with its ARN
    Confirmed(String),
}

impl SubscriptionStatus {
    /// Interprets the subscription ARN reported by SNS
    ///
    /// SNS reports `pending confirmation` instead of an ARN until the recipient confirms.
    #[must_use]
    pub fn from_arn(arn: Option<&str>) -> Self {
        match arn.map(str::trim) {
            Some(arn) if !arn.is_empty() && !is_pending_marker(arn) => {
                Self::Confirmed(arn.to_string())
            }
            _ => Self::PendingConfirmation,
        }
    }
}

fn is_pending_marker(arn: &str) -> bool {
    arn.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .eq_ignore_ascii_case("pendingconfirmation")
}

/// Topic operations backing [`super::WeatherAlertDispatcher`]
#[async_trait::async_trait]
pub trait NotificationBackend: Send + Sync {
    /// Creates the topic, or returns the ARN of an existing topic with that name
    async fn create_named_topic(&self, name: &str) -> AlertResult<String>;

    /// Publishes a message, returning its message id when reported
    async fn publish_message(
        &self,
        topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> AlertResult<Option<String>>;

    /// Requests an email subscription, returning the reported subscription ARN
    async fn subscribe_email(&self, topic_arn: &str, email: &str) -> AlertResult<Option<String>>;

    /// All subscriptions of the topic
    async fn list_topic_subscriptions(&self, topic_arn: &str)
        -> AlertResult<Vec<TopicSubscription>>;
}

#[async_trait::async_trait]
impl NotificationBackend for SnsClient {
    async fn create_named_topic(&self, name: &str) -> AlertResult<String> {
        let response = self.create_topic().name(name).send().await?;

        response
            .topic_arn()
            .map(ToString::to_string)
            .ok_or_else(|| AlertError::BackendUnavailable(format!("No ARN returned for topic {name}")))
    }

    async fn publish_message(
        &self,
        topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> AlertResult<Option<String>> {
        let response = self
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await?;

        Ok(response.message_id().map(ToString::to_string))
    }

    async fn subscribe_email(&self, topic_arn: &str, email: &str) -> AlertResult<Option<String>> {
        let response = self
            .subscribe()
            .topic_arn(topic_arn)
            .protocol(EMAIL_PROTOCOL)
            .endpoint(email)
            .send()
            .await?;

        Ok(response.subscription_arn().map(ToString::to_string))
    }

    async fn list_topic_subscriptions(
        &self,
        topic_arn: &str,
    ) -> AlertResult<Vec<TopicSubscription>> {
        let mut subscriptions = Vec::new();
        let mut next_token = None;

        loop {
            let response = self
                .list_subscriptions_by_topic()
                .topic_arn(topic_arn)
                .set_next_token(next_token.take())
                .send()
                .await?;

            subscriptions.extend(response.subscriptions().iter().map(|subscription| {
                TopicSubscription {
                    subscription_arn: subscription
                        .subscription_arn()
                        .unwrap_or_default()
                        .to_string(),
                    protocol: subscription.protocol().unwrap_or_default().to_string(),
                    endpoint: subscription.endpoint().unwrap_or_default().to_string(),
                    owner: subscription.owner().map(ToString::to_string),
                }
            }));

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(subscriptions)
    }
}
