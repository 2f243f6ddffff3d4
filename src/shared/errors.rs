use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Coarse classification callers use to pick a response
/// ("try another slot" vs "fix your input" vs "retry later").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Authorization,
    Contention,
    Storage,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    #[error("Invalid slot duration: {0} minutes (expected 1..=1440)")]
    InvalidDuration(u32),

    #[error("Slot {slot_id} starts in the past ({start})")]
    SlotInPast { slot_id: i32, start: DateTime<Utc> },

    /// Unique-constraint hit reported by a repository; services translate
    /// it into one of the specific conflict variants below.
    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Slot overlaps an existing slot on charger {charger_id}: {detail}")]
    OverlapConflict { charger_id: i32, detail: String },

    #[error("Slots already exist for charger {charger_id} on {date}")]
    DuplicateDay { charger_id: i32, date: NaiveDate },

    #[error("Recurring slot template already exists for charger {0}")]
    TemplateExists(i32),

    #[error("Slot {0} has an active booking")]
    SlotHasActiveBooking(i32),

    #[error("Slot {0} is already booked")]
    SlotAlreadyBooked(i32),

    #[error("User {user_id} already holds an active booking on charger {charger_id}")]
    DuplicateActiveBooking { user_id: i32, charger_id: i32 },

    #[error("Booking {booking_id} does not belong to user {user_id}")]
    NotOwner { booking_id: i32, user_id: i32 },

    #[error("Booking {booking_id} cannot be cancelled in status '{status}'")]
    InvalidStateForCancel { booking_id: i32, status: String },

    #[error("Session {session_id} is in status '{status}'")]
    InvalidSessionState { session_id: i32, status: String },

    #[error("Charger {0} is currently in use")]
    ChargerBusy(i32),

    #[error("Charger {charger_id} is {status}")]
    ChargerUnavailable { charger_id: i32, status: String },

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Timed out after {waited_ms} ms waiting for the lock on charger {charger_id}")]
    ResourceContention { charger_id: i32, waited_ms: u64 },

    #[error("Database error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::InvalidWindow(_)
            | Self::InvalidDuration(_)
            | Self::SlotInPast { .. } => ErrorKind::Validation,
            Self::Conflict(_)
            | Self::OverlapConflict { .. }
            | Self::DuplicateDay { .. }
            | Self::TemplateExists(_)
            | Self::SlotHasActiveBooking(_)
            | Self::SlotAlreadyBooked(_)
            | Self::DuplicateActiveBooking { .. }
            | Self::InvalidStateForCancel { .. }
            | Self::InvalidSessionState { .. }
            | Self::ChargerBusy(_)
            | Self::ChargerUnavailable { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotOwner { .. } | Self::UnknownRole(_) => ErrorKind::Authorization,
            Self::ResourceContention { .. } => ErrorKind::Contention,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether this error is likely transient (lock wait, DB connection lost)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Contention | ErrorKind::Storage)
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_distinct_from_validation() {
        assert_eq!(DomainError::SlotAlreadyBooked(1).kind(), ErrorKind::Conflict);
        assert_eq!(
            DomainError::DuplicateActiveBooking {
                user_id: 1,
                charger_id: 2
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DomainError::InvalidWindow("end before start".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(DomainError::InvalidDuration(0).kind(), ErrorKind::Validation);
    }

    #[test]
    fn ownership_and_lookup_have_their_own_kinds() {
        let err = DomainError::NotOwner {
            booking_id: 3,
            user_id: 9,
        };
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(
            DomainError::not_found("Slot", "id", 7).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn only_contention_and_storage_are_transient() {
        assert!(DomainError::ResourceContention {
            charger_id: 1,
            waited_ms: 50
        }
        .is_transient());
        assert!(DomainError::Storage("connection reset".into()).is_transient());
        assert!(!DomainError::ChargerBusy(1).is_transient());
    }

    #[test]
    fn not_found_message_names_the_entity() {
        let err = DomainError::not_found("Booking", "id", 42);
        assert_eq!(err.to_string(), "Not found: Booking with id=42");
    }
}
