//! Charger aggregate (read side; CRUD lives outside this crate)

pub mod model;
pub mod repository;

pub use model::{Charger, ChargerKey, ChargerStatus};
pub use repository::ChargerRepository;
