//! Notifier ports backed by the in-process event bus
//!
//! Push delivery and the operator dashboard subscribe to the bus; publishing
//! never blocks on them.

use async_trait::async_trait;

use crate::application::events::{
    Event, OperatorAlertEvent, SharedEventBus, UserNotificationEvent,
};
use crate::application::ports::{GatewayError, OperatorNotifier, UserNotifier};

pub struct EventBusNotifier {
    bus: SharedEventBus,
}

impl EventBusNotifier {
    pub fn new(bus: SharedEventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl UserNotifier for EventBusNotifier {
    async fn notify(
        &self,
        user_id: i32,
        title: &str,
        body: &str,
        category: &str,
    ) -> Result<(), GatewayError> {
        self.bus.publish(Event::UserNotification(UserNotificationEvent {
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            category: category.to_string(),
        }));
        Ok(())
    }
}

#[async_trait]
impl OperatorNotifier for EventBusNotifier {
    async fn broadcast_to_operators(&self, message: &str, category: &str) -> Result<(), GatewayError> {
        self.bus.publish(Event::OperatorAlert(OperatorAlertEvent {
            message: message.to_string(),
            category: category.to_string(),
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::create_event_bus;

    #[tokio::test]
    async fn user_and_operator_messages_reach_subscribers() {
        let bus = create_event_bus();
        let mut subscriber = bus.subscribe();
        let notifier = EventBusNotifier::new(bus.clone());

        notifier
            .notify(4, "Booking Expired", "too late", "BOOKING_EXPIRED")
            .await
            .unwrap();
        notifier
            .broadcast_to_operators("session 9 failed", "STALE_SESSION_CLEANUP")
            .await
            .unwrap();

        let first = subscriber.recv().await.unwrap();
        assert_eq!(first.event.user_id(), Some(4));
        assert_eq!(first.event.category(), "BOOKING_EXPIRED");

        let second = subscriber.recv().await.unwrap();
        assert_eq!(second.event.event_type(), "operator_alert");
        assert_eq!(second.event.user_id(), None);
    }
}
