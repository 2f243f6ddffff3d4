//! Booking repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Booking, BookingStatus, NewBooking};
use crate::domain::DomainResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>>;

    async fn find_by_user(&self, user_id: i32) -> DomainResult<Vec<Booking>>;

    async fn find_by_user_and_status(
        &self,
        user_id: i32,
        status: BookingStatus,
    ) -> DomainResult<Vec<Booking>>;

    async fn find_by_station(&self, station_id: i32) -> DomainResult<Vec<Booking>>;

    async fn find_by_charger(&self, charger_id: i32) -> DomainResult<Vec<Booking>>;

    async fn find_by_slot(&self, slot_id: i32) -> DomainResult<Vec<Booking>>;

    /// Whether the user holds a `booked` booking on the charger
    async fn has_active_booking(&self, user_id: i32, charger_id: i32) -> DomainResult<bool>;

    /// The user's `booked` bookings on a charger
    async fn find_active_for_user_and_charger(
        &self,
        user_id: i32,
        charger_id: i32,
    ) -> DomainResult<Vec<Booking>>;

    /// `booked` bookings whose occurrence ended strictly before `now`
    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Booking>>;

    /// Flip the slot to booked and insert a `booked` booking in one
    /// transaction. Fails with `SlotAlreadyBooked` when the flip loses a race
    /// and `DuplicateActiveBooking` when the user already holds one on the
    /// charger; nothing is committed in either case.
    async fn create_booked(&self, booking: NewBooking, now: DateTime<Utc>) -> DomainResult<Booking>;

    /// Conditional transition on the persisted status, optionally releasing
    /// the slot in the same transaction. Returns `None` when the row is no
    /// longer in `from` (another writer got there first).
    async fn transition(
        &self,
        id: i32,
        from: BookingStatus,
        to: BookingStatus,
        release_slot: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Booking>>;
}
