use std::sync::Arc;

use common_types::{Coordinates, WeatherConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Number, Value};
use weather_alerts::dispatcher::mock::{RecordingNotificationBackend, PENDING_CONFIRMATION};
use weather_alerts::{
    AlertError, AlertOutcome, SubscriptionStatus, WeatherAlert, WeatherAlertDispatcher,
};

const TOPIC_NAME: &str = "WeatherAlerts";
const PRESET_ARN: &str = "arn:aws:sns:us-east-1:123456789012:PresetAlerts";

/// Test context sharing the recording backend with the dispatcher under test
struct TestContext {
    backend: Arc<RecordingNotificationBackend>,
    dispatcher: WeatherAlertDispatcher,
}

fn setup_with(backend: RecordingNotificationBackend, topic_arn: Option<&str>) -> TestContext {
    let backend = Arc::new(backend);
    let dispatcher = WeatherAlertDispatcher::new(
        backend.clone(),
        topic_arn.map(ToString::to_string),
        TOPIC_NAME.to_string(),
    );
    TestContext {
        backend,
        dispatcher,
    }
}

fn setup_test() -> TestContext {
    setup_with(RecordingNotificationBackend::new(), None)
}

fn reykjavik() -> Coordinates {
    Coordinates::new(64.1466, -21.9426)
}

/// Creates an OpenWeather-style payload with the fields the rules read
fn snapshot(temp: f64, wind: f64, condition: &str) -> Value {
    json!({
        "weather": [{ "id": 200, "main": condition }],
        "main": { "temp": temp, "humidity": 90 },
        "wind": { "speed": wind, "deg": 10 },
        "dt": 1_700_000_000
    })
}

#[tokio::test]
async fn test_ensure_topic_creates_topic_when_not_configured() {
    let context = setup_test();

    let topic_arn = context
        .dispatcher
        .ensure_topic(TOPIC_NAME)
        .await
        .expect("Failed to ensure topic");

    assert_eq!(topic_arn, RecordingNotificationBackend::topic_arn_for(TOPIC_NAME));
    assert_eq!(context.backend.create_topic_calls(), 1);
}

#[tokio::test]
async fn test_ensure_topic_reuses_configured_arn() {
    let context = setup_with(RecordingNotificationBackend::new(), Some(PRESET_ARN));

    for _ in 0..3 {
        let topic_arn = context.dispatcher.ensure_topic(TOPIC_NAME).await.unwrap();
        assert_eq!(topic_arn, PRESET_ARN);
    }

    assert_eq!(context.backend.create_topic_calls(), 0);
}

#[tokio::test]
async fn test_ensure_topic_surfaces_creation_failure() {
    let context = setup_with(RecordingNotificationBackend::new().failing_topic_creation(), None);

    let result = context.dispatcher.ensure_topic(TOPIC_NAME).await;
    assert!(matches!(result, Err(AlertError::BackendUnavailable(_))));
}

#[tokio::test]
async fn test_temperature_rule_wins() {
    let context = setup_test();

    let outcome = context
        .dispatcher
        .evaluate_and_alert("Reykjavik", reykjavik(), &snapshot(-15.0, 90.0, "Tornado"))
        .await
        .expect("Failed to evaluate snapshot");

    assert_eq!(
        outcome,
        AlertOutcome::Sent {
            alert: WeatherAlert::ExtremeTemperature {
                temperature: Number::from_f64(-15.0).unwrap(),
            },
            message: "⚠️ Extreme Temperature Alert: -15.0°C in Reykjavik!".to_string(),
            message_id: Some("message-1".to_string()),
        }
    );

    let published = context.backend.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].subject, "Weather Alert for Reykjavik");
    assert_eq!(
        published[0].topic_arn,
        RecordingNotificationBackend::topic_arn_for(TOPIC_NAME)
    );
}

#[tokio::test]
async fn test_calm_weather_sends_nothing() {
    let context = setup_test();

    let outcome = context
        .dispatcher
        .evaluate_and_alert("Reykjavik", reykjavik(), &snapshot(20.0, 10.0, "Clear"))
        .await
        .unwrap();

    assert_eq!(outcome, AlertOutcome::NoAlert);
    assert!(context.backend.published().is_empty());
    // The topic is only resolved when there is something to publish
    assert_eq!(context.backend.create_topic_calls(), 0);
}

#[tokio::test]
async fn test_high_wind_and_severe_weather_alerts() {
    let context = setup_with(RecordingNotificationBackend::new(), Some(PRESET_ARN));

    context
        .dispatcher
        .evaluate_and_alert("Galway", Coordinates::new(53.27, -9.05), &snapshot(12.0, 85.5, "Rain"))
        .await
        .unwrap();
    context
        .dispatcher
        .evaluate_and_alert("Tulsa", Coordinates::new(36.15, -95.99), &snapshot(24.0, 30.0, "Thunderstorm"))
        .await
        .unwrap();

    let messages: Vec<String> = context
        .backend
        .published()
        .into_iter()
        .map(|published| {
            assert_eq!(published.topic_arn, PRESET_ARN);
            published.message
        })
        .collect();

    assert_eq!(
        messages,
        vec![
            "🌪️ High Wind Speed Alert: 85.5 km/h in Galway!".to_string(),
            "⛈️ Severe Weather Alert: Thunderstorm in Tulsa!".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_rejected_publish_is_surfaced() {
    let context = setup_with(RecordingNotificationBackend::new().rejecting_publish(), None);

    let result = context
        .dispatcher
        .evaluate_and_alert("Reykjavik", reykjavik(), &snapshot(45.0, 0.0, "Clear"))
        .await;

    assert!(matches!(result, Err(AlertError::NotificationFailed(_))));
}

#[tokio::test]
async fn test_incomplete_snapshot_is_rejected_before_publishing() {
    let context = setup_test();

    let result = context
        .dispatcher
        .evaluate_and_alert("Reykjavik", reykjavik(), &json!({ "main": { "temp": 50 } }))
        .await;

    assert!(matches!(result, Err(AlertError::InvalidSnapshot(_))));
    assert!(context.backend.published().is_empty());
}

#[tokio::test]
async fn test_subscribe_and_list() {
    let context = setup_test();

    let status = context
        .dispatcher
        .subscribe("alerts@example.com")
        .await
        .expect("Failed to subscribe");
    assert_eq!(status, SubscriptionStatus::PendingConfirmation);

    let subscriptions = context
        .dispatcher
        .list_subscriptions()
        .await
        .expect("Failed to list subscriptions");
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].endpoint, "alerts@example.com");
    assert_eq!(subscriptions[0].protocol, "email");
    assert_eq!(subscriptions[0].subscription_arn, PENDING_CONFIRMATION);
    assert_eq!(subscriptions[0].status(), SubscriptionStatus::PendingConfirmation);

    context.backend.confirm("alerts@example.com");
    let subscriptions = context.dispatcher.list_subscriptions().await.unwrap();
    assert!(matches!(
        subscriptions[0].status(),
        SubscriptionStatus::Confirmed(_)
    ));
}

#[tokio::test]
async fn test_list_subscriptions_empty() {
    let context = setup_with(RecordingNotificationBackend::new(), Some(PRESET_ARN));

    let subscriptions = context.dispatcher.list_subscriptions().await.unwrap();
    assert!(subscriptions.is_empty());
}

#[tokio::test]
async fn test_subscription_failures() {
    let context = setup_with(RecordingNotificationBackend::new().rejecting_subscriptions(), None);

    assert!(matches!(
        context.dispatcher.subscribe("not-an-email").await,
        Err(AlertError::SubscriptionFailed(_))
    ));
    assert!(matches!(
        context.dispatcher.list_subscriptions().await,
        Err(AlertError::SubscriptionFailed(_))
    ));
}

#[tokio::test]
async fn test_unreachable_backend() {
    let context = setup_with(RecordingNotificationBackend::new().unreachable(), Some(PRESET_ARN));

    assert!(matches!(
        context.dispatcher.subscribe("alerts@example.com").await,
        Err(AlertError::BackendUnavailable(_))
    ));
}

#[tokio::test]
async fn test_dispatcher_from_config() {
    let config = WeatherConfig {
        topic_arn: Some(PRESET_ARN.to_string()),
        ..WeatherConfig::default()
    };
    let backend = Arc::new(RecordingNotificationBackend::new());
    let dispatcher = WeatherAlertDispatcher::from_config(backend.clone(), &config);

    dispatcher
        .evaluate_and_alert("Reykjavik", reykjavik(), &snapshot(41.0, 0.0, "Clear"))
        .await
        .unwrap();

    assert_eq!(backend.create_topic_calls(), 0);
    assert_eq!(backend.published()[0].topic_arn, PRESET_ARN);
}
