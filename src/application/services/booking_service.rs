//! Booking Lifecycle Engine
//!
//! `booked → {cancelled, completed, expired}`. Every transition goes through
//! the repository's guarded `transition` so a concurrent writer (user,
//! reconciler, session start) can win at most once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::booking::{Booking, BookingStatus, NewBooking};
use crate::domain::slot::SlotWindow;
use crate::domain::{DomainError, DomainResult, ErrorKind, RepositoryProvider};

pub struct BookingService {
    repos: Arc<dyn RepositoryProvider>,
}

fn conflict_reason(err: &DomainError) -> &'static str {
    match err {
        DomainError::SlotAlreadyBooked(_) => "slot_already_booked",
        DomainError::DuplicateActiveBooking { .. } => "duplicate_active_booking",
        _ => "other",
    }
}

impl BookingService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Reserve `slot_id` for `user_id`.
    ///
    /// The read-side checks give precise errors; the guarded flip and the
    /// partial unique indexes inside `create_booked` decide races.
    pub async fn book(&self, user_id: i32, slot_id: i32, now: DateTime<Utc>) -> DomainResult<Booking> {
        let result = self.try_book(user_id, slot_id, now).await;

        match &result {
            Ok(booking) => {
                metrics::counter!("bookings_created_total").increment(1);
                info!(
                    booking_id = booking.id,
                    slot_id,
                    user_id,
                    charger_id = booking.charger_id,
                    window_start = %booking.window_start,
                    "✅ Slot booked"
                );
            }
            Err(e) if e.kind() == ErrorKind::Conflict => {
                metrics::counter!("booking_conflicts_total", "reason" => conflict_reason(e))
                    .increment(1);
                debug!(slot_id, user_id, error = %e, "Booking refused");
            }
            Err(e) => debug!(slot_id, user_id, error = %e, "Booking refused"),
        }

        result
    }

    async fn try_book(&self, user_id: i32, slot_id: i32, now: DateTime<Utc>) -> DomainResult<Booking> {
        let slot = self
            .repos
            .slots()
            .find_by_id(slot_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Slot", "id", slot_id))?;

        if slot.is_booked {
            return Err(DomainError::SlotAlreadyBooked(slot_id));
        }
        if let SlotWindow::Dated { start, .. } = slot.window {
            if start <= now {
                return Err(DomainError::SlotInPast { slot_id, start });
            }
        }
        if self
            .repos
            .bookings()
            .has_active_booking(user_id, slot.charger_id)
            .await?
        {
            return Err(DomainError::DuplicateActiveBooking {
                user_id,
                charger_id: slot.charger_id,
            });
        }

        let charger = self
            .repos
            .chargers()
            .find_by_id(slot.charger_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Charger", "id", slot.charger_id))?;

        let (window_start, window_end) = slot.window.occurrence_at(now);
        self.repos
            .bookings()
            .create_booked(
                NewBooking {
                    slot_id,
                    user_id,
                    charger_id: charger.id,
                    station_id: charger.station_id,
                    window_start,
                    window_end,
                },
                now,
            )
            .await
    }

    /// Cancel a live booking owned by `user_id` and release its slot.
    pub async fn cancel(
        &self,
        booking_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> DomainResult<Booking> {
        let booking = self.get(booking_id).await?;

        if booking.user_id != user_id {
            warn!(booking_id, user_id, owner = booking.user_id, "Cancel by non-owner refused");
            return Err(DomainError::NotOwner {
                booking_id,
                user_id,
            });
        }
        if booking.status != BookingStatus::Booked {
            return Err(DomainError::InvalidStateForCancel {
                booking_id,
                status: booking.status.to_string(),
            });
        }

        let cancelled = self
            .repos
            .bookings()
            .transition(
                booking_id,
                BookingStatus::Booked,
                BookingStatus::Cancelled,
                true,
                now,
            )
            .await?;

        match cancelled {
            Some(booking) => {
                metrics::counter!("bookings_cancelled_total").increment(1);
                info!(booking_id, user_id, slot_id = booking.slot_id, "🚫 Booking cancelled");
                Ok(booking)
            }
            None => {
                // lost the race: report whatever state won
                let status = self
                    .repos
                    .bookings()
                    .find_by_id(booking_id)
                    .await?
                    .map(|b| b.status.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                Err(DomainError::InvalidStateForCancel { booking_id, status })
            }
        }
    }

    /// Mark the user's booking on `charger_id` whose occurrence contains
    /// `now` as completed. Recurring slots are released so the template can
    /// be booked again; dated slots stay consumed.
    ///
    /// Having no matching booking is not an error.
    pub async fn complete(
        &self,
        user_id: i32,
        charger_id: i32,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Booking>> {
        let live = self
            .repos
            .bookings()
            .find_active_for_user_and_charger(user_id, charger_id)
            .await?;
        let Some(booking) = live.into_iter().find(|b| b.covers(now)) else {
            debug!(user_id, charger_id, "No booking to complete");
            return Ok(None);
        };

        let release = self
            .repos
            .slots()
            .find_by_id(booking.slot_id)
            .await?
            .map(|slot| slot.is_recurring())
            .unwrap_or(false);

        let completed = self
            .repos
            .bookings()
            .transition(
                booking.id,
                BookingStatus::Booked,
                BookingStatus::Completed,
                release,
                now,
            )
            .await?;

        if let Some(done) = &completed {
            metrics::counter!("bookings_completed_total").increment(1);
            info!(
                booking_id = done.id,
                user_id,
                charger_id,
                slot_released = release,
                "🏁 Booking completed"
            );
        }
        Ok(completed)
    }

    pub async fn get(&self, booking_id: i32) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))
    }

    pub async fn list_for_user(&self, user_id: i32) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_by_user(user_id).await
    }

    pub async fn list_active_for_user(&self, user_id: i32) -> DomainResult<Vec<Booking>> {
        self.repos
            .bookings()
            .find_by_user_and_status(user_id, BookingStatus::Booked)
            .await
    }

    pub async fn list_for_station(&self, station_id: i32) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_by_station(station_id).await
    }

    pub async fn list_for_charger(&self, charger_id: i32) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_by_charger(charger_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::domain::slot::NewSlot;
    use crate::domain::Slot;
    use crate::test_support::{seed_charger, test_repos, utc};

    fn now() -> DateTime<Utc> {
        utc(2030, 5, 1, 8, 0)
    }

    struct Fixture {
        bookings: Arc<BookingService>,
        repos: Arc<dyn RepositoryProvider>,
        charger_id: i32,
        station_id: i32,
    }

    async fn fixture() -> Fixture {
        let repos = test_repos().await;
        let charger = seed_charger(repos.as_ref(), "CP-BOOK").await;
        Fixture {
            bookings: Arc::new(BookingService::new(repos.clone())),
            repos,
            charger_id: charger.id,
            station_id: charger.station_id,
        }
    }

    impl Fixture {
        async fn dated_slot(&self, start: DateTime<Utc>) -> Slot {
            let window = SlotWindow::dated(start, start + Duration::hours(1)).unwrap();
            self.repos
                .slots()
                .insert(
                    NewSlot {
                        charger_id: self.charger_id,
                        window,
                    },
                    now(),
                )
                .await
                .unwrap()
        }

        async fn recurring_slot(&self, start_minute: u32) -> Slot {
            let window = SlotWindow::recurring(start_minute, start_minute + 60).unwrap();
            self.repos
                .slots()
                .insert(
                    NewSlot {
                        charger_id: self.charger_id,
                        window,
                    },
                    now(),
                )
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn book_then_read_back() {
        let fx = fixture().await;
        let slot = fx.dated_slot(utc(2030, 5, 1, 10, 0)).await;

        let booking = fx.bookings.book(7, slot.id, now()).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Booked);
        assert_eq!(booking.station_id, fx.station_id);
        assert_eq!(booking.window_start, utc(2030, 5, 1, 10, 0));

        let slot = fx.repos.slots().find_by_id(slot.id).await.unwrap().unwrap();
        assert!(slot.is_booked);
        let live: Vec<_> = fx
            .repos
            .bookings()
            .find_by_slot(slot.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|b| b.is_active())
            .collect();
        assert_eq!(live.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_bookings_on_one_slot_have_one_winner() {
        let fx = fixture().await;
        let slot = fx.dated_slot(utc(2030, 5, 1, 10, 0)).await;

        let slot_id = slot.id;
        let mut handles = Vec::new();
        for user_id in 1..=8 {
            let bookings = fx.bookings.clone();
            handles.push(tokio::spawn(async move {
                bookings.book(user_id, slot_id, now()).await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(DomainError::SlotAlreadyBooked(id)) => assert_eq!(id, slot_id),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(fx.bookings.list_for_charger(fx.charger_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_live_booking_per_user_and_charger() {
        let fx = fixture().await;
        let first = fx.dated_slot(utc(2030, 5, 1, 10, 0)).await;
        let second = fx.dated_slot(utc(2030, 5, 1, 12, 0)).await;

        fx.bookings.book(7, first.id, now()).await.unwrap();
        let again = fx.bookings.book(7, second.id, now()).await;
        assert!(matches!(
            again,
            Err(DomainError::DuplicateActiveBooking { user_id: 7, .. })
        ));

        // the losing attempt left the second slot untouched
        let second = fx.repos.slots().find_by_id(second.id).await.unwrap().unwrap();
        assert!(!second.is_booked);
        assert!(fx.bookings.book(8, second.id, now()).await.is_ok());
    }

    #[tokio::test]
    async fn storage_rejects_a_second_live_booking_even_without_the_read_check() {
        let fx = fixture().await;
        let first = fx.dated_slot(utc(2030, 5, 1, 10, 0)).await;
        let second = fx.dated_slot(utc(2030, 5, 1, 12, 0)).await;
        fx.bookings.book(7, first.id, now()).await.unwrap();

        let direct = fx
            .repos
            .bookings()
            .create_booked(
                NewBooking {
                    slot_id: second.id,
                    user_id: 7,
                    charger_id: fx.charger_id,
                    station_id: fx.station_id,
                    window_start: utc(2030, 5, 1, 12, 0),
                    window_end: utc(2030, 5, 1, 13, 0),
                },
                now(),
            )
            .await;
        assert!(matches!(direct, Err(DomainError::DuplicateActiveBooking { .. })));

        // the slot flip rolled back with the failed insert
        let second = fx.repos.slots().find_by_id(second.id).await.unwrap().unwrap();
        assert!(!second.is_booked);
    }

    #[tokio::test]
    async fn booking_a_started_slot_is_rejected() {
        let fx = fixture().await;
        let slot = fx.dated_slot(utc(2030, 5, 1, 8, 0)).await;

        let result = fx.bookings.book(7, slot.id, now()).await;
        assert!(matches!(result, Err(DomainError::SlotInPast { .. })));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn missing_slot_is_not_found() {
        let fx = fixture().await;
        assert!(matches!(
            fx.bookings.book(7, 999, now()).await,
            Err(DomainError::NotFound { entity: "Slot", .. })
        ));
    }

    #[tokio::test]
    async fn recurring_booking_claims_the_next_occurrence() {
        let fx = fixture().await;
        // 07:00-08:00 daily has ended at 08:00, so tomorrow's occurrence is claimed
        let slot = fx.recurring_slot(7 * 60).await;

        let booking = fx.bookings.book(7, slot.id, now()).await.unwrap();
        assert_eq!(booking.window_start, utc(2030, 5, 2, 7, 0));
        assert_eq!(booking.window_end, utc(2030, 5, 2, 8, 0));
    }

    #[tokio::test]
    async fn cancel_releases_the_slot_once() {
        let fx = fixture().await;
        let slot = fx.dated_slot(utc(2030, 5, 1, 10, 0)).await;
        let booking = fx.bookings.book(7, slot.id, now()).await.unwrap();

        let cancelled_at = utc(2030, 5, 1, 8, 15);
        let cancelled = fx.bookings.cancel(booking.id, 7, cancelled_at).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.updated_at, cancelled_at);
        let slot_after = fx.repos.slots().find_by_id(slot.id).await.unwrap().unwrap();
        assert!(!slot_after.is_booked);

        let twice = fx.bookings.cancel(booking.id, 7, now()).await;
        assert!(matches!(
            twice,
            Err(DomainError::InvalidStateForCancel { ref status, .. }) if status == "cancelled"
        ));

        // the released slot can be booked again
        assert!(fx.bookings.book(9, slot.id, now()).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_by_someone_else_is_refused() {
        let fx = fixture().await;
        let slot = fx.dated_slot(utc(2030, 5, 1, 10, 0)).await;
        let booking = fx.bookings.book(7, slot.id, now()).await.unwrap();

        let result = fx.bookings.cancel(booking.id, 8, now()).await;
        assert!(matches!(result, Err(DomainError::NotOwner { .. })));
        assert_eq!(fx.bookings.get(booking.id).await.unwrap().status, BookingStatus::Booked);

        assert!(matches!(
            fx.bookings.cancel(4242, 7, now()).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn complete_keeps_dated_slots_consumed() {
        let fx = fixture().await;
        let slot = fx.dated_slot(utc(2030, 5, 1, 10, 0)).await;
        let booking = fx.bookings.book(7, slot.id, now()).await.unwrap();

        let done = fx
            .bookings
            .complete(7, fx.charger_id, utc(2030, 5, 1, 10, 15))
            .await
            .unwrap()
            .expect("booking completed");
        assert_eq!(done.id, booking.id);
        assert_eq!(done.status, BookingStatus::Completed);

        let slot = fx.repos.slots().find_by_id(slot.id).await.unwrap().unwrap();
        assert!(slot.is_booked);
    }

    #[tokio::test]
    async fn complete_releases_recurring_slots() {
        let fx = fixture().await;
        let slot = fx.recurring_slot(9 * 60).await;
        fx.bookings.book(7, slot.id, now()).await.unwrap();

        let done = fx
            .bookings
            .complete(7, fx.charger_id, utc(2030, 5, 1, 10, 0))
            .await
            .unwrap();
        assert!(done.is_some());

        let slot = fx.repos.slots().find_by_id(slot.id).await.unwrap().unwrap();
        assert!(!slot.is_booked);
        assert!(fx.bookings.list_active_for_user(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn complete_outside_the_window_is_a_no_op() {
        let fx = fixture().await;
        let slot = fx.dated_slot(utc(2030, 5, 1, 10, 0)).await;
        fx.bookings.book(7, slot.id, now()).await.unwrap();

        let early = fx
            .bookings
            .complete(7, fx.charger_id, utc(2030, 5, 1, 9, 0))
            .await
            .unwrap();
        assert!(early.is_none());
        assert!(fx
            .bookings
            .complete(99, fx.charger_id, utc(2030, 5, 1, 10, 30))
            .await
            .unwrap()
            .is_none());
        assert_eq!(fx.bookings.list_active_for_user(7).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn queries_filter_by_owner_and_station() {
        let fx = fixture().await;
        let a = fx.dated_slot(utc(2030, 5, 1, 10, 0)).await;
        let b = fx.dated_slot(utc(2030, 5, 1, 12, 0)).await;
        let first = fx.bookings.book(7, a.id, now()).await.unwrap();
        fx.bookings.book(8, b.id, now()).await.unwrap();
        fx.bookings.cancel(first.id, 7, now()).await.unwrap();

        assert_eq!(fx.bookings.list_for_user(7).await.unwrap().len(), 1);
        assert!(fx.bookings.list_active_for_user(7).await.unwrap().is_empty());
        assert_eq!(fx.bookings.list_for_station(fx.station_id).await.unwrap().len(), 2);
        assert!(fx.bookings.list_for_station(fx.station_id + 100).await.unwrap().is_empty());
    }
}
