use sea_orm_migration::prelude::*;

use crate::m20251018_000001_create_accounts::Users;
use crate::m20251018_000003_create_catalog::Movies;

#[derive(DeriveIden)]
enum Purchases {
    Table,
    Id,
    UserId,
    MovieId,
    Amount,
    Currency,
    PaymentMethod,
    TransactionId,
    Status,
    EntitlementKey,
    PurchaseDate,
    CompletedDate,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Purchases::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Purchases::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Purchases::MovieId).big_integer().not_null())
                    .col(ColumnDef::new(Purchases::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Purchases::Currency).string_len(8).not_null())
                    .col(ColumnDef::new(Purchases::PaymentMethod).string_len(20).not_null())
                    .col(ColumnDef::new(Purchases::TransactionId).string_len(64).null())
                    .col(
                        ColumnDef::new(Purchases::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    // "{user_id}:{movie_id}" on COMPLETED rows only, NULL otherwise
                    .col(
                        ColumnDef::new(Purchases::EntitlementKey)
                            .string_len(64)
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Purchases::PurchaseDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::CompletedDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchases_user")
                            .from(Purchases::Table, Purchases::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchases_movie")
                            .from(Purchases::Table, Purchases::MovieId)
                            .to(Movies::Table, Movies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_purchases_user_movie")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .col(Purchases::MovieId)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await
    }
}
