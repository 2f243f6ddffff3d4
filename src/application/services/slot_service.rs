//! Slot Store service
//!
//! Operator-side slot creation (single, bulk per day, recurring template),
//! listing, and deletion. Writes for one charger run under that charger's
//! lock so the overlap and duplicate checks are not raced in-process; the
//! unique indexes on `slots` catch anything that slips through.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::charger_lock::ChargerLockManager;
use crate::domain::slot::{generate_day_windows, start_of_day, BulkMode, NewSlot, Slot, SlotWindow};
use crate::domain::{ChargerKey, DomainError, DomainResult, RepositoryProvider};

pub struct SlotService {
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<ChargerLockManager>,
}

fn describe(window: &SlotWindow) -> String {
    match window {
        SlotWindow::Dated { start, end } => format!("[{}, {})", start, end),
        SlotWindow::Recurring {
            start_minute,
            end_minute,
        } => format!(
            "daily [{:02}:{:02}, {:02}:{:02})",
            start_minute / 60,
            start_minute % 60,
            end_minute / 60,
            end_minute % 60
        ),
    }
}

impl SlotService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, locks: Arc<ChargerLockManager>) -> Self {
        Self { repos, locks }
    }

    /// Create a single slot. Touching windows are allowed; any overlap with a
    /// slot of the same kind on the charger is rejected.
    pub async fn create_slot(
        &self,
        charger_id: i32,
        window: SlotWindow,
        now: DateTime<Utc>,
    ) -> DomainResult<Slot> {
        window.validate()?;

        self.locks
            .with_charger_lock(ChargerKey::Id(charger_id), |_charger| async move {
                let clash = match window {
                    SlotWindow::Dated { start, end } => self
                        .repos
                        .slots()
                        .find_overlapping(charger_id, start, end)
                        .await?
                        .into_iter()
                        .next(),
                    SlotWindow::Recurring { .. } => self
                        .repos
                        .slots()
                        .find_recurring(charger_id)
                        .await?
                        .into_iter()
                        .find(|s| s.window.overlaps(&window)),
                };
                if let Some(existing) = clash {
                    return Err(DomainError::OverlapConflict {
                        charger_id,
                        detail: format!(
                            "{} overlaps slot {} {}",
                            describe(&window),
                            existing.id,
                            describe(&existing.window)
                        ),
                    });
                }

                let slot = self
                    .repos
                    .slots()
                    .insert(NewSlot { charger_id, window }, now)
                    .await
                    .map_err(|e| match e {
                        DomainError::Conflict(detail) => {
                            DomainError::OverlapConflict { charger_id, detail }
                        }
                        other => other,
                    })?;

                metrics::counter!("slots_created_total").increment(1);
                info!(slot_id = slot.id, charger_id, window = %describe(&slot.window), "🗓️ Slot created");
                Ok(slot)
            })
            .await
    }

    /// Fill one day (or the recurring template) with back-to-back slots of
    /// `duration_minutes`. All rows are inserted in one transaction.
    pub async fn create_bulk_slots(
        &self,
        charger_id: i32,
        mode: BulkMode,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Slot>> {
        let windows = generate_day_windows(mode, duration_minutes)?;

        self.locks
            .with_charger_lock(ChargerKey::Id(charger_id), |_charger| async move {
                let already_exists = || match mode {
                    BulkMode::Date(date) => DomainError::DuplicateDay { charger_id, date },
                    BulkMode::Recurring => DomainError::TemplateExists(charger_id),
                };

                match mode {
                    BulkMode::Date(date) => {
                        let day_start = start_of_day(date);
                        let day_end = day_start + Duration::days(1);
                        let slots = self.repos.slots();
                        if !slots
                            .find_starting_between(charger_id, day_start, day_end)
                            .await?
                            .is_empty()
                        {
                            return Err(already_exists());
                        }
                        // a slot from the previous day may run past midnight
                        if let Some(spill) = slots
                            .find_overlapping(charger_id, day_start, day_end)
                            .await?
                            .into_iter()
                            .next()
                        {
                            return Err(DomainError::OverlapConflict {
                                charger_id,
                                detail: format!(
                                    "slot {} {} runs into {}",
                                    spill.id,
                                    describe(&spill.window),
                                    date
                                ),
                            });
                        }
                    }
                    BulkMode::Recurring => {
                        if !self.repos.slots().find_recurring(charger_id).await?.is_empty() {
                            return Err(already_exists());
                        }
                    }
                }

                let new_slots = windows
                    .into_iter()
                    .map(|window| NewSlot { charger_id, window })
                    .collect();
                let created = self
                    .repos
                    .slots()
                    .insert_batch(new_slots, now)
                    .await
                    .map_err(|e| match e {
                        DomainError::Conflict(_) => already_exists(),
                        other => other,
                    })?;

                metrics::counter!("slots_created_total").increment(created.len() as u64);
                info!(
                    charger_id,
                    ?mode,
                    duration_minutes,
                    count = created.len(),
                    "🗓️ Bulk slots created"
                );
                Ok(created)
            })
            .await
    }

    /// Bookable slots: free recurring slots first, then free dated slots
    /// starting after `now`.
    pub async fn list_available(&self, charger_id: i32, now: DateTime<Utc>) -> DomainResult<Vec<Slot>> {
        self.repos.slots().find_available(charger_id, now).await
    }

    /// Every slot on the charger, booked or not
    pub async fn list_for_charger(&self, charger_id: i32) -> DomainResult<Vec<Slot>> {
        self.repos.slots().find_by_charger(charger_id).await
    }

    pub async fn get(&self, slot_id: i32) -> DomainResult<Slot> {
        self.repos
            .slots()
            .find_by_id(slot_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Slot", "id", slot_id))
    }

    /// Delete a slot no live booking references. Completed, cancelled and
    /// expired bookings of the slot are purged with it.
    pub async fn delete(&self, slot_id: i32) -> DomainResult<()> {
        let slot = self.get(slot_id).await?;
        let purged = self.repos.slots().delete_with_history(slot_id).await?;
        info!(slot_id, charger_id = slot.charger_id, purged_bookings = purged, "🗑️ Slot deleted");
        Ok(())
    }
}
