use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PostsById::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PostsById::PostId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PostsById::AuthorId).uuid().not_null())
                    .col(ColumnDef::new(PostsById::Content).text().not_null())
                    .col(ColumnDef::new(PostsById::MediaRefs).json_binary().not_null())
                    .col(ColumnDef::new(PostsById::Latitude).double().not_null())
                    .col(ColumnDef::new(PostsById::Longitude).double().not_null())
                    .col(ColumnDef::new(PostsById::Cell).string_len(12).not_null())
                    .col(ColumnDef::new(PostsById::CellPrefix).string_len(12).not_null())
                    .col(
                        ColumnDef::new(PostsById::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PostsById::OriginAddress).string())
                    .col(ColumnDef::new(PostsById::UserAgent).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PostsByCell::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PostsByCell::CellPrefix).string_len(12).not_null())
                    .col(
                        ColumnDef::new(PostsByCell::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PostsByCell::PostId).uuid().not_null())
                    .col(ColumnDef::new(PostsByCell::AuthorId).uuid().not_null())
                    .col(ColumnDef::new(PostsByCell::Content).text().not_null())
                    .col(ColumnDef::new(PostsByCell::MediaRefs).json_binary().not_null())
                    .col(ColumnDef::new(PostsByCell::Latitude).double().not_null())
                    .col(ColumnDef::new(PostsByCell::Longitude).double().not_null())
                    .col(ColumnDef::new(PostsByCell::Cell).string_len(12).not_null())
                    .primary_key(
                        Index::create()
                            .col(PostsByCell::CellPrefix)
                            .col(PostsByCell::CreatedAt)
                            .col(PostsByCell::PostId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PostsByAuthor::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PostsByAuthor::AuthorId).uuid().not_null())
                    .col(
                        ColumnDef::new(PostsByAuthor::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PostsByAuthor::PostId).uuid().not_null())
                    .col(ColumnDef::new(PostsByAuthor::CellPrefix).string_len(12).not_null())
                    .col(ColumnDef::new(PostsByAuthor::Content).text().not_null())
                    .col(ColumnDef::new(PostsByAuthor::MediaRefs).json_binary().not_null())
                    .col(ColumnDef::new(PostsByAuthor::Latitude).double().not_null())
                    .col(ColumnDef::new(PostsByAuthor::Longitude).double().not_null())
                    .col(ColumnDef::new(PostsByAuthor::Cell).string_len(12).not_null())
                    .primary_key(
                        Index::create()
                            .col(PostsByAuthor::AuthorId)
                            .col(PostsByAuthor::CreatedAt)
                            .col(PostsByAuthor::PostId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LocationNames::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LocationNames::CellPrefix)
                            .string_len(12)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LocationNames::DisplayName).text().not_null())
                    .col(ColumnDef::new(LocationNames::Name).string().not_null())
                    .col(ColumnDef::new(LocationNames::Address).json_binary().not_null())
                    .col(ColumnDef::new(LocationNames::Latitude).double().not_null())
                    .col(ColumnDef::new(LocationNames::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(LocationNames::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LocationNames::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PostsByAuthor::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PostsByCell::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PostsById::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PostsById {
    Table,
    PostId,
    AuthorId,
    Content,
    MediaRefs,
    Latitude,
    Longitude,
    Cell,
    CellPrefix,
    CreatedAt,
    OriginAddress,
    UserAgent,
}

#[derive(DeriveIden)]
enum PostsByCell {
    Table,
    CellPrefix,
    CreatedAt,
    PostId,
    AuthorId,
    Content,
    MediaRefs,
    Latitude,
    Longitude,
    Cell,
}

#[derive(DeriveIden)]
enum PostsByAuthor {
    Table,
    AuthorId,
    CreatedAt,
    PostId,
    CellPrefix,
    Content,
    MediaRefs,
    Latitude,
    Longitude,
    Cell,
}

#[derive(DeriveIden)]
enum LocationNames {
    Table,
    CellPrefix,
    DisplayName,
    Name,
    Address,
    Latitude,
    Longitude,
    CreatedAt,
}
