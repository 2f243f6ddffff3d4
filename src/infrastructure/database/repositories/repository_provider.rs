//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::booking::BookingRepository;
use crate::domain::charger::ChargerRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::session::SessionRepository;
use crate::domain::slot::SlotRepository;
use crate::domain::station::StationRepository;

use super::booking_repository::SeaOrmBookingRepository;
use super::charger_repository::SeaOrmChargerRepository;
use super::session_repository::SeaOrmSessionRepository;
use super::slot_repository::SeaOrmSlotRepository;
use super::station_repository::SeaOrmStationRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let slot = repos.slots().find_by_id(12).await?;
/// let open = repos.sessions().find_open_for_charger(3).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    slots: SeaOrmSlotRepository,
    bookings: SeaOrmBookingRepository,
    chargers: SeaOrmChargerRepository,
    stations: SeaOrmStationRepository,
    sessions: SeaOrmSessionRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            slots: SeaOrmSlotRepository::new(db.clone()),
            bookings: SeaOrmBookingRepository::new(db.clone()),
            chargers: SeaOrmChargerRepository::new(db.clone()),
            stations: SeaOrmStationRepository::new(db.clone()),
            sessions: SeaOrmSessionRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn slots(&self) -> &dyn SlotRepository {
        &self.slots
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn chargers(&self) -> &dyn ChargerRepository {
        &self.chargers
    }

    fn stations(&self) -> &dyn StationRepository {
        &self.stations
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }
}
