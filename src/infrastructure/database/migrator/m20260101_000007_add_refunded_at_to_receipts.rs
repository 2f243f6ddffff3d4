//! Migration: Add refunded_at to receipts
//!
//! A failed session whose receipt has no `refunded_at` still owes the user a
//! wallet credit; the stale session reconciler retries it every run.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Receipts::Table)
                    .add_column(
                        ColumnDef::new(Receipts::RefundedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_receipts_refunded_at")
                    .table(Receipts::Table)
                    .col(Receipts::RefundedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_receipts_refunded_at")
                    .table(Receipts::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Receipts::Table)
                    .drop_column(Receipts::RefundedAt)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Receipts {
    Table,
    RefundedAt,
}
