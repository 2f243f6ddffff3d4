//! Station aggregate (read side used by access control)

pub mod model;
pub mod repository;

pub use model::Station;
pub use repository::StationRepository;
