//! Repository access for the domain layer

use super::booking::BookingRepository;
use super::charger::ChargerRepository;
use super::session::SessionRepository;
use super::slot::SlotRepository;
use super::station::StationRepository;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let slot = repos.slots().find_by_id(12).await?;
///     let overdue = repos.bookings().find_overdue(Utc::now()).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn slots(&self) -> &dyn SlotRepository;
    fn bookings(&self) -> &dyn BookingRepository;
    fn chargers(&self) -> &dyn ChargerRepository;
    fn stations(&self) -> &dyn StationRepository;
    fn sessions(&self) -> &dyn SessionRepository;
}
