//! Create slots table
//!
//! Unique (charger_id, start_at) and (charger_id, start_minute) catch
//! duplicate slots created by a concurrent writer. NULLs never collide, so
//! dated and recurring rows only compete with their own kind.

use sea_orm_migration::prelude::*;

use super::m20260101_000002_create_chargers::Chargers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Slots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Slots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Slots::ChargerId).integer().not_null())
                    .col(ColumnDef::new(Slots::StartAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Slots::EndAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Slots::StartMinute).integer())
                    .col(ColumnDef::new(Slots::EndMinute).integer())
                    .col(
                        ColumnDef::new(Slots::AllDay)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Slots::IsBooked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Slots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_slots_charger")
                            .from(Slots::Table, Slots::ChargerId)
                            .to(Chargers::Table, Chargers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slots_charger_all_day")
                    .table(Slots::Table)
                    .col(Slots::ChargerId)
                    .col(Slots::AllDay)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_slots_charger_start_at")
                    .table(Slots::Table)
                    .col(Slots::ChargerId)
                    .col(Slots::StartAt)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_slots_charger_start_minute")
                    .table(Slots::Table)
                    .col(Slots::ChargerId)
                    .col(Slots::StartMinute)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Slots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Slots {
    Table,
    Id,
    ChargerId,
    StartAt,
    EndAt,
    StartMinute,
    EndMinute,
    AllDay,
    IsBooked,
    CreatedAt,
}
