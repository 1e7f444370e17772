use sea_orm_migration::prelude::*;

use crate::m20251018_000001_create_accounts::Users;

#[derive(DeriveIden)]
enum Verifications {
    Table,
    Id,
    UserId,
    Code,
    Channel,
    ExpiresAt,
    Used,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Verifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Verifications::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Verifications::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Verifications::Code).string_len(16).not_null())
                    .col(ColumnDef::new(Verifications::Channel).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Verifications::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Verifications::Used)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Verifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_verifications_user")
                            .from(Verifications::Table, Verifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_verifications_user_channel")
                    .table(Verifications::Table)
                    .col(Verifications::UserId)
                    .col(Verifications::Channel)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Verifications::Table).to_owned())
            .await
    }
}
