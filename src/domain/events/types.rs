//! Notification events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    UserNotification(UserNotificationEvent),
    OperatorAlert(OperatorAlertEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::UserNotification(_) => "user_notification",
            Event::OperatorAlert(_) => "operator_alert",
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Event::UserNotification(e) => &e.category,
            Event::OperatorAlert(e) => &e.category,
        }
    }

    /// Recipient, if the event targets a single user
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Event::UserNotification(e) => Some(e.user_id),
            Event::OperatorAlert(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNotificationEvent {
    pub user_id: i32,
    pub title: String,
    pub body: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorAlertEvent {
    pub message: String,
    pub category: String,
}

/// Wrapper for sending events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
