//! Recording [`NotificationBackend`] for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{AlertError, AlertResult, NotificationBackend, TopicSubscription, EMAIL_PROTOCOL};

/// Marker SNS reports for unconfirmed subscriptions
pub const PENDING_CONFIRMATION: &str = "pending confirmation";

/// Message captured by [`RecordingNotificationBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Topic the message was published to
    pub topic_arn: String,
    /// Subject line
    pub subject: String,
    /// Message body
    pub message: String,
}

/// Which calls of [`RecordingNotificationBackend`] fail
#[derive(Debug, Clone, Copy, Default)]
struct Failures {
    create_topic: bool,
    publish: bool,
    subscribe: bool,
    unreachable: bool,
}

/// In-memory notification backend recording every call
#[derive(Default)]
pub struct RecordingNotificationBackend {
    published: Mutex<Vec<PublishedMessage>>,
    /// Subscriptions with the topic they belong to
    subscriptions: Mutex<Vec<(String, TopicSubscription)>>,
    create_topic_calls: AtomicUsize,
    failures: Failures,
}

impl RecordingNotificationBackend {
    /// Backend where every call succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Topic creation fails
    #[must_use]
    pub fn failing_topic_creation(mut self) -> Self {
        self.failures.create_topic = true;
        self
    }

    /// Publishing is rejected
    #[must_use]
    pub fn rejecting_publish(mut self) -> Self {
        self.failures.publish = true;
        self
    }

    /// Subscribe and list requests are rejected
    #[must_use]
    pub fn rejecting_subscriptions(mut self) -> Self {
        self.failures.subscribe = true;
        self
    }

    /// Every request fails before reaching the service
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.failures.unreachable = true;
        self
    }

    /// Topic ARN the backend hands out for `name`
    #[must_use]
    pub fn topic_arn_for(name: &str) -> String {
        format!("arn:aws:sns:us-east-1:000000000000:{name}")
    }

    /// Number of topic creations requested
    pub fn create_topic_calls(&self) -> usize {
        self.create_topic_calls.load(Ordering::SeqCst)
    }

    /// Messages published so far
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().expect("published lock poisoned").clone()
    }

    /// Marks the subscription of `email` as confirmed
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned
    pub fn confirm(&self, email: &str) {
        let mut subscriptions = self.subscriptions.lock().expect("subscriptions lock poisoned");
        for (index, (topic_arn, subscription)) in subscriptions.iter_mut().enumerate() {
            if subscription.endpoint == email {
                subscription.subscription_arn = format!("{topic_arn}:subscription-{index}");
            }
        }
    }

    fn check_reachable(&self) -> AlertResult<()> {
        if self.failures.unreachable {
            return Err(AlertError::BackendUnavailable(
                "dispatch failure: connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationBackend for RecordingNotificationBackend {
    async fn create_named_topic(&self, name: &str) -> AlertResult<String> {
        self.check_reachable()?;
        self.create_topic_calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.create_topic {
            return Err(AlertError::BackendUnavailable(format!(
                "AuthorizationError: cannot create topic {name}"
            )));
        }
        Ok(Self::topic_arn_for(name))
    }

    async fn publish_message(
        &self,
        topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> AlertResult<Option<String>> {
        self.check_reachable()?;
        if self.failures.publish {
            return Err(AlertError::NotificationFailed(
                "InvalidParameter: topic does not exist".to_string(),
            ));
        }

        let mut published = self.published.lock().expect("published lock poisoned");
        published.push(PublishedMessage {
            topic_arn: topic_arn.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        });
        Ok(Some(format!("message-{}", published.len())))
    }

    async fn subscribe_email(&self, topic_arn: &str, email: &str) -> AlertResult<Option<String>> {
        self.check_reachable()?;
        if self.failures.subscribe {
            return Err(AlertError::SubscriptionFailed(
                "InvalidParameter: invalid email address".to_string(),
            ));
        }

        let mut subscriptions = self.subscriptions.lock().expect("subscriptions lock poisoned");
        let already_subscribed = subscriptions
            .iter()
            .any(|(topic, subscription)| topic == topic_arn && subscription.endpoint == email);
        if !already_subscribed {
            subscriptions.push((
                topic_arn.to_string(),
                TopicSubscription {
                    subscription_arn: PENDING_CONFIRMATION.to_string(),
                    protocol: EMAIL_PROTOCOL.to_string(),
                    endpoint: email.to_string(),
                    owner: Some("000000000000".to_string()),
                },
            ));
        }
        Ok(Some(PENDING_CONFIRMATION.to_string()))
    }

    async fn list_topic_subscriptions(
        &self,
        topic_arn: &str,
    ) -> AlertResult<Vec<TopicSubscription>> {
        self.check_reachable()?;
        if self.failures.subscribe {
            return Err(AlertError::SubscriptionFailed(
                "AuthorizationError: not allowed to list subscriptions".to_string(),
            ));
        }
        Ok(self
            .subscriptions
            .lock()
            .expect("subscriptions lock poisoned")
            .iter()
            .filter(|(topic, _)| topic == topic_arn)
            .map(|(_, subscription)| subscription.clone())
            .collect())
    }
}
