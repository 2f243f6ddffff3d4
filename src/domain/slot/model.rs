//! Slot domain entity

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::shared::errors::{DomainError, DomainResult};

pub const MINUTES_PER_DAY: u32 = 1440;

/// Reservable time window of a slot.
///
/// Both variants are half-open: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotWindow {
    /// Absolute window on a specific day
    Dated {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Minutes of the day, repeating every day (member of an all-day template).
    /// `end_minute` may be 1440 (midnight of the following day).
    Recurring { start_minute: u32, end_minute: u32 },
}

impl SlotWindow {
    pub fn dated(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        let window = Self::Dated { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn recurring(start_minute: u32, end_minute: u32) -> DomainResult<Self> {
        let window = Self::Recurring {
            start_minute,
            end_minute,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> DomainResult<()> {
        match *self {
            Self::Dated { start, end } => {
                if end <= start {
                    return Err(DomainError::InvalidWindow(format!(
                        "end {} must be after start {}",
                        end, start
                    )));
                }
            }
            Self::Recurring {
                start_minute,
                end_minute,
            } => {
                if end_minute > MINUTES_PER_DAY {
                    return Err(DomainError::InvalidWindow(format!(
                        "end minute {} is past the end of the day",
                        end_minute
                    )));
                }
                if end_minute <= start_minute {
                    return Err(DomainError::InvalidWindow(format!(
                        "end minute {} must be after start minute {}",
                        end_minute, start_minute
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, Self::Recurring { .. })
    }

    /// Half-open overlap test. Windows of different kinds never overlap:
    /// a recurring window has no absolute date to compare against.
    pub fn overlaps(&self, other: &SlotWindow) -> bool {
        match (*self, *other) {
            (Self::Dated { start: a0, end: a1 }, Self::Dated { start: b0, end: b1 }) => {
                a0 < b1 && b0 < a1
            }
            (
                Self::Recurring {
                    start_minute: a0,
                    end_minute: a1,
                },
                Self::Recurring {
                    start_minute: b0,
                    end_minute: b1,
                },
            ) => a0 < b1 && b0 < a1,
            _ => false,
        }
    }

    /// The concrete occurrence a booking made at `now` claims.
    ///
    /// Dated windows are their own occurrence. Recurring windows resolve to
    /// today's occurrence, or tomorrow's if today's has already ended.
    pub fn occurrence_at(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match *self {
            Self::Dated { start, end } => (start, end),
            Self::Recurring {
                start_minute,
                end_minute,
            } => {
                let midnight = start_of_day(now.date_naive());
                let start = midnight + Duration::minutes(i64::from(start_minute));
                let end = midnight + Duration::minutes(i64::from(end_minute));
                if end <= now {
                    (start + Duration::days(1), end + Duration::days(1))
                } else {
                    (start, end)
                }
            }
        }
    }
}

/// 00:00 UTC of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Reservable slot on a charger
#[derive(Debug, Clone)]
pub struct Slot {
    pub id: i32,
    pub charger_id: i32,
    pub window: SlotWindow,
    pub is_booked: bool,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn is_recurring(&self) -> bool {
        self.window.is_recurring()
    }

    /// Recurring slots have no absolute start and are always bookable
    /// time-wise.
    pub fn starts_after(&self, now: DateTime<Utc>) -> bool {
        match self.window {
            SlotWindow::Dated { start, .. } => start > now,
            SlotWindow::Recurring { .. } => true,
        }
    }
}

/// Slot to be inserted
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub charger_id: i32,
    pub window: SlotWindow,
}

/// Bulk generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkMode {
    /// One calendar day (UTC)
    Date(NaiveDate),
    /// The daily recurring template
    Recurring,
}

/// Back-to-back windows covering 00:00–24:00.
///
/// A trailing remainder shorter than `duration_minutes` is dropped.
pub fn generate_day_windows(mode: BulkMode, duration_minutes: u32) -> DomainResult<Vec<SlotWindow>> {
    if duration_minutes == 0 || duration_minutes > MINUTES_PER_DAY {
        return Err(DomainError::InvalidDuration(duration_minutes));
    }

    let count = MINUTES_PER_DAY / duration_minutes;
    let windows = (0..count).map(|i| {
        let start_minute = i * duration_minutes;
        let end_minute = start_minute + duration_minutes;
        match mode {
            BulkMode::Recurring => SlotWindow::Recurring {
                start_minute,
                end_minute,
            },
            BulkMode::Date(date) => {
                let midnight = start_of_day(date);
                SlotWindow::Dated {
                    start: midnight + Duration::minutes(i64::from(start_minute)),
                    end: midnight + Duration::minutes(i64::from(end_minute)),
                }
            }
        }
    });

    Ok(windows.collect())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 5, 1, h, m, 0).unwrap()
    }

    #[test]
    fn dated_window_requires_end_after_start() {
        assert!(SlotWindow::dated(at(10, 0), at(11, 0)).is_ok());
        assert!(matches!(
            SlotWindow::dated(at(10, 0), at(10, 0)),
            Err(DomainError::InvalidWindow(_))
        ));
        assert!(matches!(
            SlotWindow::dated(at(11, 0), at(10, 0)),
            Err(DomainError::InvalidWindow(_))
        ));
    }

    #[test]
    fn recurring_window_stays_within_a_day() {
        assert!(SlotWindow::recurring(1380, 1440).is_ok());
        assert!(SlotWindow::recurring(1380, 1441).is_err());
        assert!(SlotWindow::recurring(60, 60).is_err());
    }

    #[test]
    fn touching_windows_do_not_overlap() {
        let a = SlotWindow::dated(at(10, 0), at(11, 0)).unwrap();
        let b = SlotWindow::dated(at(10, 30), at(11, 30)).unwrap();
        let c = SlotWindow::dated(at(11, 0), at(12, 0)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn dated_and_recurring_never_overlap() {
        let dated = SlotWindow::dated(at(0, 0), at(23, 0)).unwrap();
        let recurring = SlotWindow::recurring(0, 1440).unwrap();
        assert!(!dated.overlaps(&recurring));
    }

    #[test]
    fn sixty_minute_day_yields_24_contiguous_slots() {
        let date = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        let windows = generate_day_windows(BulkMode::Date(date), 60).unwrap();
        assert_eq!(windows.len(), 24);

        let first = windows.first().unwrap();
        let last = windows.last().unwrap();
        assert_eq!(*first, SlotWindow::Dated { start: at(0, 0), end: at(1, 0) });
        assert!(matches!(last, SlotWindow::Dated { end, .. } if *end == start_of_day(date.succ_opt().unwrap())));

        for pair in windows.windows(2) {
            match (pair[0], pair[1]) {
                (SlotWindow::Dated { end, .. }, SlotWindow::Dated { start, .. }) => {
                    assert_eq!(end, start)
                }
                _ => panic!("expected dated windows"),
            }
            assert!(!pair[0].overlaps(&pair[1]));
        }
    }

    #[test]
    fn non_divisible_duration_drops_the_remainder() {
        let windows = generate_day_windows(BulkMode::Recurring, 25).unwrap();
        assert_eq!(windows.len(), 57);
        assert_eq!(
            windows.last(),
            Some(&SlotWindow::Recurring {
                start_minute: 1400,
                end_minute: 1425
            })
        );
    }

    #[test]
    fn duration_bounds_are_enforced() {
        assert!(matches!(
            generate_day_windows(BulkMode::Recurring, 0),
            Err(DomainError::InvalidDuration(0))
        ));
        assert!(matches!(
            generate_day_windows(BulkMode::Recurring, 1441),
            Err(DomainError::InvalidDuration(1441))
        ));
        assert_eq!(generate_day_windows(BulkMode::Recurring, 1440).unwrap().len(), 1);
    }

    #[test]
    fn recurring_occurrence_rolls_over_once_ended() {
        let window = SlotWindow::recurring(9 * 60, 10 * 60).unwrap();

        let (start, end) = window.occurrence_at(at(8, 0));
        assert_eq!((start, end), (at(9, 0), at(10, 0)));

        // inside the window: still today's occurrence
        let (start, _) = window.occurrence_at(at(9, 30));
        assert_eq!(start, at(9, 0));

        let (start, end) = window.occurrence_at(at(10, 0));
        assert_eq!(start, at(9, 0) + Duration::days(1));
        assert_eq!(end, at(10, 0) + Duration::days(1));
    }

    #[test]
    fn only_dated_slots_can_be_in_the_past() {
        let past = Slot {
            id: 1,
            charger_id: 1,
            window: SlotWindow::dated(at(8, 0), at(9, 0)).unwrap(),
            is_booked: false,
            created_at: at(0, 0),
        };
        assert!(!past.starts_after(at(8, 0)));
        assert!(past.starts_after(at(7, 59)));

        let recurring = Slot {
            window: SlotWindow::recurring(0, 60).unwrap(),
            ..past
        };
        assert!(recurring.starts_after(at(23, 0)));
    }
}
