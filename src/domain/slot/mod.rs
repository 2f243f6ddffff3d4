//! Slot aggregate
//!
//! Contains the Slot entity, window arithmetic, and repository interface.

pub mod model;
pub mod repository;

pub use model::{generate_day_windows, start_of_day, BulkMode, NewSlot, Slot, SlotWindow, MINUTES_PER_DAY};
pub use repository::SlotRepository;
