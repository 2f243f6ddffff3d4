//! Create wallet_credits table
//!
//! The unique `reference` column makes every credit idempotent.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WalletCredits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletCredits::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WalletCredits::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(WalletCredits::Reference)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(WalletCredits::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletCredits::Reason).string().not_null())
                    .col(
                        ColumnDef::new(WalletCredits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallet_credits_user")
                    .table(WalletCredits::Table)
                    .col(WalletCredits::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WalletCredits::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum WalletCredits {
    Table,
    Id,
    UserId,
    Reference,
    AmountMinor,
    Reason,
    CreatedAt,
}
