//! Charging session and receipt entities

use chrono::{DateTime, Utc};

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Remote start sent, waiting for the charger to acknowledge
    Initiated,
    /// Charger confirmed, energy flowing
    Active,
    Completed,
    /// Never acknowledged or aborted
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initiated" => Some(Self::Initiated),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Initiated and active sessions occupy the charger
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Initiated | Self::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: i32,
    pub user_id: i32,
    pub charger_id: i32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Still waiting for the hardware after `cutoff`
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Initiated && self.created_at < cutoff
    }
}

/// Payment captured when a session was started.
/// Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub id: i32,
    pub session_id: i32,
    pub user_id: i32,
    pub amount_minor: i64,
    pub created_at: DateTime<Utc>,
    /// When the refund for a failed session was confirmed by the ledger
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Receipt {
    /// Money was captured and has not been paid back yet
    pub fn is_refundable(&self) -> bool {
        self.amount_minor > 0 && self.refunded_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn only_initiated_sessions_go_stale() {
        let created = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        let mut session = Session {
            id: 1,
            user_id: 2,
            charger_id: 3,
            status: SessionStatus::Initiated,
            created_at: created,
            ended_at: None,
        };
        assert!(session.is_stale(created + Duration::seconds(1)));
        assert!(!session.is_stale(created));

        session.status = SessionStatus::Active;
        assert!(!session.is_stale(created + Duration::hours(1)));
    }

    #[test]
    fn refunded_or_free_receipts_owe_nothing() {
        let created = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        let mut receipt = Receipt {
            id: 1,
            session_id: 2,
            user_id: 3,
            amount_minor: 500,
            created_at: created,
            refunded_at: None,
        };
        assert!(receipt.is_refundable());

        receipt.refunded_at = Some(created);
        assert!(!receipt.is_refundable());

        receipt.refunded_at = None;
        receipt.amount_minor = 0;
        assert!(!receipt.is_refundable());
    }

    #[test]
    fn open_statuses() {
        assert!(SessionStatus::Initiated.is_open());
        assert!(SessionStatus::Active.is_open());
        assert!(!SessionStatus::Failed.is_open());
        assert_eq!(SessionStatus::from_str("Active"), Some(SessionStatus::Active));
    }
}
