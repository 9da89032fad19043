//! Weather alert dispatching for the weather alerting workspace
//!
//! Evaluates weather snapshots against fixed thresholds and publishes at most one
//! alert per snapshot to an SNS topic, and manages the topic's email subscriptions.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// SNS topic operations and the alert dispatcher
pub mod dispatcher;
/// Threshold rules
pub mod rules;

pub use dispatcher::{
    AlertError, AlertOutcome, AlertResult, NotificationBackend, SubscriptionStatus,
    TopicSubscription, WeatherAlertDispatcher,
};
pub use rules::{evaluate_snapshot, WeatherAlert};
