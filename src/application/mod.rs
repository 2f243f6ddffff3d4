pub mod events;
pub mod ports;
pub mod services;

pub use events::{create_event_bus, Event, EventBus, NotificationSubscriber, SharedEventBus};
pub use ports::{CreditOutcome, GatewayError, OperatorNotifier, UserNotifier, WalletLedger};
pub use services::{
    BookingExpiryReconciler, BookingService, ChargerLockManager, EventBusNotifier,
    SessionStartService, SlotService, StaleSessionReconciler, StationAccessRegistry,
};
