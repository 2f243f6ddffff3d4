//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod booking_repository;
pub mod charger_repository;
pub mod repository_provider;
pub mod session_repository;
pub mod slot_repository;
pub mod station_repository;
pub mod wallet_ledger;

pub use repository_provider::SeaOrmRepositoryProvider;
pub use wallet_ledger::SeaOrmWalletLedger;

use sea_orm::{DbErr, SqlErr};

use crate::domain::DomainError;

pub(crate) fn db_err(e: DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

/// Like [`db_err`], but unique-index hits become `DomainError::Conflict`
/// carrying the driver message (it names the violated index or columns).
pub(crate) fn write_err(e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => DomainError::Conflict(msg),
        _ => db_err(e),
    }
}
