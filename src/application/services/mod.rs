//! Application services

pub mod booking_expiry;
pub mod booking_service;
pub mod charger_lock;
pub mod notifier;
pub mod session_start;
pub mod slot_service;
pub mod stale_session;
pub mod station_access;

pub use booking_expiry::{start_booking_expiry_task, BookingExpiryReconciler, ExpiryReport};
pub use booking_service::BookingService;
pub use charger_lock::ChargerLockManager;
pub use notifier::EventBusNotifier;
pub use session_start::SessionStartService;
pub use slot_service::SlotService;
pub use stale_session::{start_stale_session_task, StaleSessionReconciler, StaleSessionReport};
pub use station_access::{
    AdminStationAccess, DealerStationAccess, StationAccess, StationAccessRegistry,
};
