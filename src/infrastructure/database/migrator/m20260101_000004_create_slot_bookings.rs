//! Create slot_bookings table
//!
//! Two partial unique indexes hold the booking invariants at the storage
//! level: one live booking per slot, one live booking per (user, charger).

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

use super::m20260101_000003_create_slots::Slots;

#[derive(DeriveMigrationName)]
pub struct Migration;

pub const UQ_ACTIVE_SLOT: &str = "uq_slot_bookings_active_slot";
pub const UQ_ACTIVE_USER_CHARGER: &str = "uq_slot_bookings_active_user_charger";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SlotBookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SlotBookings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SlotBookings::SlotId).integer().not_null())
                    .col(ColumnDef::new(SlotBookings::UserId).integer().not_null())
                    .col(ColumnDef::new(SlotBookings::ChargerId).integer().not_null())
                    .col(ColumnDef::new(SlotBookings::StationId).integer().not_null())
                    .col(
                        ColumnDef::new(SlotBookings::Status)
                            .string()
                            .not_null()
                            .default("booked"),
                    )
                    .col(
                        ColumnDef::new(SlotBookings::WindowStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SlotBookings::WindowEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SlotBookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SlotBookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_slot_bookings_slot")
                            .from(SlotBookings::Table, SlotBookings::SlotId)
                            .to(Slots::Table, Slots::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slot_bookings_slot")
                    .table(SlotBookings::Table)
                    .col(SlotBookings::SlotId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slot_bookings_charger")
                    .table(SlotBookings::Table)
                    .col(SlotBookings::ChargerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slot_bookings_user_status")
                    .table(SlotBookings::Table)
                    .col(SlotBookings::UserId)
                    .col(SlotBookings::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slot_bookings_station")
                    .table(SlotBookings::Table)
                    .col(SlotBookings::StationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slot_bookings_status_window_end")
                    .table(SlotBookings::Table)
                    .col(SlotBookings::Status)
                    .col(SlotBookings::WindowEnd)
                    .to_owned(),
            )
            .await?;

        // Partial indexes are not expressible through the index builder
        let db = manager.get_connection();
        db.execute_unprepared(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON slot_bookings (slot_id) WHERE status = 'booked'",
            UQ_ACTIVE_SLOT
        ))
        .await?;
        db.execute_unprepared(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON slot_bookings (user_id, charger_id) WHERE status = 'booked'",
            UQ_ACTIVE_USER_CHARGER
        ))
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SlotBookings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SlotBookings {
    Table,
    Id,
    SlotId,
    UserId,
    ChargerId,
    StationId,
    Status,
    WindowStart,
    WindowEnd,
    CreatedAt,
    UpdatedAt,
}
