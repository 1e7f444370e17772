use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub enum Movies {
    Table,
    Id,
    Title,
    Director,
    ReleaseDate,
    DurationMinutes,
    Rating,
    Plot,
    Featured,
}

#[derive(DeriveIden)]
enum MovieGenres {
    Table,
    MovieId,
    Genre,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Movies::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Movies::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Movies::Director).string_len(255).not_null())
                    .col(ColumnDef::new(Movies::ReleaseDate).date().null())
                    .col(ColumnDef::new(Movies::DurationMinutes).integer().null())
                    .col(ColumnDef::new(Movies::Rating).double().not_null())
                    .col(ColumnDef::new(Movies::Plot).string_len(1000).null())
                    .col(
                        ColumnDef::new(Movies::Featured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieGenres::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MovieGenres::MovieId).big_integer().not_null())
                    .col(ColumnDef::new(MovieGenres::Genre).string_len(100).not_null())
                    .primary_key(
                        Index::create()
                            .col(MovieGenres::MovieId)
                            .col(MovieGenres::Genre),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genres_movie")
                            .from(MovieGenres::Table, MovieGenres::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_movies_title")
                    .table(Movies::Table)
                    .col(Movies::Title)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MovieGenres::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Movies::Table).to_owned())
            .await
    }
}
