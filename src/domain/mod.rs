//! Domain layer: entities, status machines, repository contracts and events

pub mod booking;
pub mod charger;
pub mod events;
pub mod repositories;
pub mod session;
pub mod slot;
pub mod station;

pub use booking::{Booking, BookingRepository, BookingStatus, NewBooking};
pub use charger::{Charger, ChargerKey, ChargerRepository, ChargerStatus};
pub use repositories::RepositoryProvider;
pub use session::{Receipt, Session, SessionRepository, SessionStatus};
pub use slot::{BulkMode, NewSlot, Slot, SlotRepository, SlotWindow};
pub use station::{Station, StationRepository};

pub use crate::shared::errors::{DomainError, DomainResult, ErrorKind};
