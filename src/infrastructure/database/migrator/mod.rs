//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20260101_000001_create_stations;
mod m20260101_000002_create_chargers;
mod m20260101_000003_create_slots;
mod m20260101_000004_create_slot_bookings;
mod m20260101_000005_create_sessions;
mod m20260101_000006_create_wallet_credits;
mod m20260101_000007_add_refunded_at_to_receipts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_stations::Migration),
            Box::new(m20260101_000002_create_chargers::Migration),
            Box::new(m20260101_000003_create_slots::Migration),
            Box::new(m20260101_000004_create_slot_bookings::Migration),
            Box::new(m20260101_000005_create_sessions::Migration),
            Box::new(m20260101_000006_create_wallet_credits::Migration),
            Box::new(m20260101_000007_add_refunded_at_to_receipts::Migration),
        ]
    }
}

pub use m20260101_000004_create_slot_bookings::{UQ_ACTIVE_SLOT, UQ_ACTIVE_USER_CHARGER};
