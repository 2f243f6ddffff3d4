//! Slot repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{NewSlot, Slot};
use crate::domain::DomainResult;

#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Insert one slot. A unique-index hit surfaces as `DomainError::Conflict`.
    async fn insert(&self, slot: NewSlot, now: DateTime<Utc>) -> DomainResult<Slot>;

    /// Insert all slots in one transaction, or none of them.
    async fn insert_batch(&self, slots: Vec<NewSlot>, now: DateTime<Utc>) -> DomainResult<Vec<Slot>>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Slot>>;

    /// Every slot of a charger, recurring first
    async fn find_by_charger(&self, charger_id: i32) -> DomainResult<Vec<Slot>>;

    /// Dated slots intersecting `[start, end)`
    async fn find_overlapping(
        &self,
        charger_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Slot>>;

    /// Dated slots starting in `[from, to)`
    async fn find_starting_between(
        &self,
        charger_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Slot>>;

    async fn find_recurring(&self, charger_id: i32) -> DomainResult<Vec<Slot>>;

    /// Unbooked recurring slots, then unbooked dated slots starting after `now`
    async fn find_available(&self, charger_id: i32, now: DateTime<Utc>) -> DomainResult<Vec<Slot>>;

    /// Flip `is_booked` false → true. Returns false if the slot was already booked.
    async fn mark_booked(&self, id: i32) -> DomainResult<bool>;

    /// Flip `is_booked` true → false. Returns false if the slot was already free.
    async fn mark_free(&self, id: i32) -> DomainResult<bool>;

    /// Delete a slot no live booking references, together with its terminal
    /// booking history. Returns the number of purged bookings.
    async fn delete_with_history(&self, id: i32) -> DomainResult<u64>;
}
