//! Booking domain entity

use chrono::{DateTime, Utc};

/// Booking status.
///
/// `Booked` is the only live state; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    /// Slot is reserved by the user
    Booked,
    /// User cancelled the booking
    Cancelled,
    /// User showed up and started charging
    Completed,
    /// Slot window elapsed without a session
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }

    /// Case-insensitive parse of the persisted value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "booked" => Some(Self::Booked),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Booked)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's claim on a slot
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: i32,
    pub slot_id: i32,
    pub user_id: i32,
    /// Denormalized from the slot for per-charger filtering
    pub charger_id: i32,
    /// Denormalized from the charger for per-station filtering
    pub station_id: i32,
    pub status: BookingStatus,
    /// Start of the occurrence this booking claims
    pub window_start: DateTime<Utc>,
    /// End of the occurrence this booking claims
    pub window_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Booked
    }

    /// Whether `now` falls inside the claimed occurrence (inclusive bounds,
    /// a session started on the last minute still counts).
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        self.window_start <= now && now <= self.window_end
    }

    /// The claimed occurrence has ended and the booking was never used
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.window_end < now
    }
}

/// Booking to be inserted together with flipping its slot
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub slot_id: i32,
    pub user_id: i32,
    pub charger_id: i32,
    pub station_id: i32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

// ── Tests ──────────────────────────────────────────────────────
