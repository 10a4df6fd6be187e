//! Notification dispatch for triggered proximity matches.
//!
//! Delivery transport is external; this module defines the payload and the
//! dispatcher abstraction plus a mock used in development and tests.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ProximityMatch,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::ProximityMatch => write!(f, "proximity_match"),
        }
    }
}

/// Payload sent to an alert owner when one of their alerts fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityMatchEvent {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub alert_id: Uuid,
    pub matched_user_id: Uuid,
    pub shared_interests: Vec<String>,
    /// Rounded to whole meters.
    pub distance_meters: f64,
}

impl ProximityMatchEvent {
    pub fn new(
        alert_id: Uuid,
        matched_user_id: Uuid,
        shared_interests: Vec<String>,
        distance_meters: f64,
    ) -> Self {
        Self {
            notification_type: NotificationType::ProximityMatch,
            alert_id,
            matched_user_id,
            shared_interests,
            distance_meters: distance_meters.round(),
        }
    }
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationResult {
    /// Notification was sent successfully.
    Sent,
    /// Notification sending failed (but was non-blocking).
    Failed(String),
    /// Notification was skipped (e.g. the owner muted alerts).
    Skipped,
}

/// Dispatcher trait for delivering match notifications to alert owners.
#[async_trait::async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver a proximity match event to `owner_id`. Best effort.
    ///
    /// The engine abandons calls that outlive `ProximitySettings::notify_timeout`.
    async fn notify(&self, owner_id: Uuid, event: ProximityMatchEvent) -> NotificationResult;
}

/// Mock dispatcher for development and testing.
///
/// Logs notifications and keeps them in memory instead of sending them.
#[derive(Debug, Default)]
pub struct MockNotificationDispatcher {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    /// Log without retaining events, for long-running servers.
    pub log_only: bool,
    sent: Mutex<Vec<(Uuid, ProximityMatchEvent)>>,
}

impl MockNotificationDispatcher {
    /// Create a new mock dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock dispatcher that simulates failures.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Create a dispatcher that only logs.
    pub fn log_only() -> Self {
        Self {
            log_only: true,
            ..Self::default()
        }
    }

    /// Events delivered so far, oldest first.
    pub fn sent(&self) -> Vec<(Uuid, ProximityMatchEvent)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for MockNotificationDispatcher {
    async fn notify(&self, owner_id: Uuid, event: ProximityMatchEvent) -> NotificationResult {
        if self.simulate_failure {
            tracing::warn!(
                owner_id = %owner_id,
                alert_id = %event.alert_id,
                "Mock notification dispatcher simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            owner_id = %owner_id,
            alert_id = %event.alert_id,
            matched_user_id = %event.matched_user_id,
            distance_meters = event.distance_meters,
            shared_interests = event.shared_interests.len(),
            "Mock: Would send proximity_match notification"
        );

        if self.log_only {
            return NotificationResult::Sent;
        }

        match self.sent.lock() {
            Ok(mut sent) => {
                sent.push((owner_id, event));
                NotificationResult::Sent
            }
            Err(_) => NotificationResult::Failed("Recorder poisoned".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_display() {
        assert_eq!(NotificationType::ProximityMatch.to_string(), "proximity_match");
    }

    #[test]
    fn test_event_serialization() {
        let event = ProximityMatchEvent::new(
            Uuid::nil(),
            Uuid::nil(),
            vec!["climbing".to_string()],
            46.6,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"proximity_match\""));
        assert!(json.contains("\"sharedInterests\":[\"climbing\"]"));
        assert!(json.contains("\"distanceMeters\":47.0"));
    }

    #[tokio::test]
    async fn test_mock_dispatcher_records_sent_events() {
        let dispatcher = MockNotificationDispatcher::new();
        let owner = Uuid::new_v4();
        let event = ProximityMatchEvent::new(Uuid::new_v4(), Uuid::new_v4(), vec![], 120.0);

        let result = dispatcher.notify(owner, event.clone()).await;
        assert_eq!(result, NotificationResult::Sent);
        assert_eq!(dispatcher.sent(), vec![(owner, event)]);
    }

    #[tokio::test]
    async fn test_log_only_dispatcher_keeps_nothing() {
        let dispatcher = MockNotificationDispatcher::log_only();
        let event = ProximityMatchEvent::new(Uuid::new_v4(), Uuid::new_v4(), vec![], 10.0);

        let result = dispatcher.notify(Uuid::new_v4(), event).await;
        assert_eq!(result, NotificationResult::Sent);
        assert!(dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mock_dispatcher_failure() {
        let dispatcher = MockNotificationDispatcher::failing();
        let event = ProximityMatchEvent::new(Uuid::new_v4(), Uuid::new_v4(), vec![], 10.0);

        let result = dispatcher.notify(Uuid::new_v4(), event).await;
        assert!(matches!(result, NotificationResult::Failed(_)));
        assert!(dispatcher.sent().is_empty());
    }
}
