//! Application events (pub/sub)
//!
//! Notification types are defined in `domain::events`. The `EventBus`
//! implementation (broadcast channel) lives here in the application layer.

pub mod event_bus;

pub use crate::domain::events::types;
pub use crate::domain::events::types::*;

pub use event_bus::{create_event_bus, Audience, EventBus, NotificationSubscriber, SharedEventBus};
