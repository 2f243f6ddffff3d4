//! # EV Slot Booking
//!
//! Reservation core for EV chargers: time slots, bookings, and the
//! background reconcilers that keep them consistent with charging sessions.
//!
//! ## Architecture
//!
//! - **domain**: entities, status machines, repository contracts, events
//! - **application**: booking/slot/session services, per-charger locking,
//!   reconcilers, station access, outbound ports
//! - **infrastructure**: SeaORM entities, migrations, repositories, wallet ledger
//! - **shared**: errors, retry, shutdown
//! - **server**: runtime wiring used by the CLI binary

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod server;
pub mod shared;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

pub use application::{create_event_bus, Event, EventBus, SharedEventBus};
