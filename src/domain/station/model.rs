//! Station domain entity

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
