//! Domain events
//!
//! Facts broadcast to in-process subscribers (push delivery, audit log).
//! The EventBus implementation lives in `application::events`.

pub mod types;

pub use types::{Event, EventMessage, OperatorAlertEvent, UserNotificationEvent};
