//! Error types for alert dispatch operations

use std::error::Error as StdError;

use aws_sdk_sns::error::{DisplayErrorContext, SdkError};
use aws_sdk_sns::operation::{
    create_topic::CreateTopicError, list_subscriptions_by_topic::ListSubscriptionsByTopicError,
    publish::PublishError, subscribe::SubscribeError,
};
use thiserror::Error;

/// Result type for alert dispatch operations
pub type AlertResult<T> = Result<T, AlertError>;

/// Errors that can occur during alert dispatch operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    /// SNS could not be reached, or the topic could not be created
    #[error("SNS backend unavailable: {0}")]
    BackendUnavailable(String),

    /// SNS rejected the alert message
    #[error("Failed to publish weather alert: {0}")]
    NotificationFailed(String),

    /// SNS rejected a subscribe or list request
    #[error("Subscription request failed: {0}")]
    SubscriptionFailed(String),

    /// The snapshot lacks a field the threshold rules need
    #[error("Invalid weather snapshot: {0}")]
    InvalidSnapshot(String),
}

impl AlertError {
    /// Maps a service rejection with `rejected`, anything else to `BackendUnavailable`
    fn classify<E>(error: SdkError<E>, rejected: fn(String) -> Self) -> Self
    where
        E: StdError + 'static,
    {
        let is_service_error = matches!(error, SdkError::ServiceError(_));
        let message = DisplayErrorContext(error).to_string();
        if is_service_error {
            rejected(message)
        } else {
            Self::BackendUnavailable(message)
        }
    }
}

impl From<SdkError<CreateTopicError>> for AlertError {
    fn from(error: SdkError<CreateTopicError>) -> Self {
        Self::BackendUnavailable(DisplayErrorContext(error).to_string())
    }
}

impl From<SdkError<PublishError>> for AlertError {
    fn from(error: SdkError<PublishError>) -> Self {
        Self::classify(error, Self::NotificationFailed)
    }
}

impl From<SdkError<SubscribeError>> for AlertError {
    fn from(error: SdkError<SubscribeError>) -> Self {
        Self::classify(error, Self::SubscriptionFailed)
    }
}

impl From<SdkError<ListSubscriptionsByTopicError>> for AlertError {
    fn from(error: SdkError<ListSubscriptionsByTopicError>) -> Self {
        Self::classify(error, Self::SubscriptionFailed)
    }
}
