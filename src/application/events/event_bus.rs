//! In-process notification bus
//!
//! Reconcilers and services publish user notifications (expired bookings,
//! failed sessions, refunds) and operator alerts. Push delivery subscribes
//! per user; the operator dashboard subscribes to alerts only. A slow
//! subscriber drops old notifications instead of stalling the publisher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::types::{Event, EventMessage};

const DEFAULT_CAPACITY: usize = 1024;

/// Which notifications a subscriber wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    /// Notifications addressed to one user
    User(i32),
    /// Operator alerts only
    Operators,
}

impl Audience {
    fn wants(&self, event: &Event) -> bool {
        match (self, event) {
            (Audience::All, _) => true,
            (Audience::User(id), Event::UserNotification(n)) => n.user_id == *id,
            (Audience::Operators, Event::OperatorAlert(_)) => true,
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscribers: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a subscriber may fall behind before it
    /// starts losing notifications.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fan a notification out to every attached subscriber. Returns how many
    /// receivers got it; zero is not an error.
    pub fn publish(&self, event: Event) -> usize {
        let message = EventMessage::new(event);
        let kind = message.event.event_type();
        let recipient = message.event.user_id();
        let category = message.event.category().to_string();

        let delivered = self.sender.send(message).unwrap_or(0);
        debug!(kind, ?recipient, category, delivered, "Notification published");
        delivered
    }

    /// Receive every notification.
    pub fn subscribe(&self) -> NotificationSubscriber {
        self.attach(Audience::All)
    }

    /// Receive only notifications addressed to `user_id`.
    pub fn subscribe_user(&self, user_id: i32) -> NotificationSubscriber {
        self.attach(Audience::User(user_id))
    }

    /// Receive only operator alerts.
    pub fn subscribe_operators(&self) -> NotificationSubscriber {
        self.attach(Audience::Operators)
    }

    fn attach(&self, audience: Audience) -> NotificationSubscriber {
        let receiver = self.sender.subscribe();
        let attached = self.subscribers.fetch_add(1, Ordering::SeqCst) + 1;
        info!(?audience, attached, "Notification subscriber attached");

        NotificationSubscriber {
            audience,
            receiver,
            subscribers: self.subscribers.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NotificationSubscriber {
    audience: Audience,
    receiver: broadcast::Receiver<EventMessage>,
    subscribers: Arc<AtomicUsize>,
}

impl NotificationSubscriber {
    pub fn audience(&self) -> Audience {
        self.audience
    }

    /// Next notification for this audience. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if self.audience.wants(&msg.event) => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(dropped)) => {
                    warn!(audience = ?self.audience, dropped, "Notification subscriber lagged, oldest notifications dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for NotificationSubscriber {
    fn drop(&mut self) {
        let prev = self.subscribers.fetch_sub(1, Ordering::SeqCst);
        info!(
            audience = ?self.audience,
            attached = prev.saturating_sub(1),
            "Notification subscriber detached"
        );
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{OperatorAlertEvent, UserNotificationEvent};

    fn expired(user_id: i32) -> Event {
        Event::UserNotification(UserNotificationEvent {
            user_id,
            title: "Booking Expired".into(),
            body: "Your booking expired".into(),
            category: "BOOKING_EXPIRED".into(),
        })
    }

    fn stale_alert(session_id: i32) -> Event {
        Event::OperatorAlert(OperatorAlertEvent {
            message: format!("session {} timed out", session_id),
            category: "STALE_SESSION_CLEANUP".into(),
        })
    }

    #[tokio::test]
    async fn every_subscriber_gets_the_same_notification() {
        let bus = EventBus::new();
        let mut push = bus.subscribe();
        let mut dashboard = bus.subscribe();

        assert_eq!(bus.publish(expired(7)), 2);

        let a = push.recv().await.expect("push subscriber");
        let b = dashboard.recv().await.expect("dashboard subscriber");
        assert_eq!(a.id, b.id);
        assert_eq!(a.event.user_id(), Some(7));
        assert_eq!(b.event.category(), "BOOKING_EXPIRED");
    }

    #[tokio::test]
    async fn user_subscriber_skips_other_users_and_operator_alerts() {
        let bus = EventBus::new();
        let mut user = bus.subscribe_user(7);
        let mut operators = bus.subscribe_operators();

        bus.publish(expired(8));
        bus.publish(stale_alert(4));
        bus.publish(expired(7));

        let mine = user.recv().await.expect("user notification");
        assert_eq!(mine.event.user_id(), Some(7));

        let alert = operators.recv().await.expect("operator alert");
        assert_eq!(alert.event.event_type(), "operator_alert");
        assert_eq!(alert.event.category(), "STALE_SESSION_CLEANUP");
    }

    #[tokio::test]
    async fn publishing_with_nobody_listening_delivers_nothing() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(stale_alert(4)), 0);
    }

    #[tokio::test]
    async fn closed_bus_ends_the_subscription() {
        let bus = EventBus::new();
        let mut user = bus.subscribe_user(3);
        bus.publish(expired(3));
        drop(bus);

        assert!(user.recv().await.is_some());
        assert!(user.recv().await.is_none());
    }

    #[tokio::test]
    async fn detaching_a_subscriber_updates_the_count() {
        let bus = EventBus::new();
        let sub = bus.subscribe_operators();
        assert_eq!(sub.audience(), Audience::Operators);
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn notification_serializes_with_type_tag() {
        let message = EventMessage::new(expired(3));
        let json = serde_json::to_value(&message).expect("serialize");
        assert_eq!(json["type"], "user_notification");
        assert_eq!(json["data"]["user_id"], 3);
    }
}
