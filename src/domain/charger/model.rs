//! Charger domain entity

use chrono::{DateTime, Utc};

/// Charger availability as last reported by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerStatus {
    /// In use (any OCPP "occupied" state)
    Busy,
    Available,
    Offline,
    Faulted,
}

impl ChargerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Available => "available",
            Self::Offline => "offline",
            Self::Faulted => "faulted",
        }
    }

    /// Maps persisted values and raw OCPP connector states.
    /// Anything unrecognised is treated as offline.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "busy" | "occupied" | "charging" | "preparing" | "suspendedevse" | "suspendedev"
            | "finishing" | "reserved" => Self::Busy,
            "available" => Self::Available,
            "faulted" | "error" => Self::Faulted,
            _ => Self::Offline,
        }
    }

    /// Whether a new session may be started from this state
    pub fn accepts_sessions(&self) -> bool {
        matches!(self, Self::Available | Self::Busy)
    }
}

impl std::fmt::Display for ChargerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Charger {
    pub id: i32,
    pub station_id: i32,
    /// Identity used by the hardware protocol
    pub ocpp_id: String,
    pub status: ChargerStatus,
    pub created_at: DateTime<Utc>,
}

/// The two equivalent ways to address a charger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargerKey {
    Id(i32),
    OcppId(String),
}

impl std::fmt::Display for ChargerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={}", id),
            Self::OcppId(ocpp_id) => write!(f, "ocpp_id={}", ocpp_id),
        }
    }
}

impl From<i32> for ChargerKey {
    fn from(id: i32) -> Self {
        Self::Id(id)
    }
}

// ── Tests ──────────────────────────────────────────────────────
