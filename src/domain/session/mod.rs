//! Charging session aggregate
//!
//! Sessions are written by the session-start flow and the stale-session
//! reconciler; receipts link captured payments to them.

pub mod model;
pub mod repository;

pub use model::{Receipt, Session, SessionStatus};
pub use repository::SessionRepository;
