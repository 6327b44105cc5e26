use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// `like_state` is authoritative; `like_audit` is the replicated copy the
/// audit worker maintains. Both share one layout.
fn like_table<T: IntoIden + 'static>(table: T) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(ColumnDef::new(Like::TargetType).string_len(16).not_null())
        .col(ColumnDef::new(Like::TargetId).uuid().not_null())
        .col(ColumnDef::new(Like::UserId).uuid().not_null())
        .col(
            ColumnDef::new(Like::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .primary_key(
            Index::create()
                .col(Like::TargetType)
                .col(Like::TargetId)
                .col(Like::UserId),
        )
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(like_table(LikeState::Table)).await?;
        manager.create_table(like_table(LikeAudit::Table)).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LikeAudit::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LikeState::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LikeState {
    Table,
}

#[derive(DeriveIden)]
enum LikeAudit {
    Table,
}

#[derive(DeriveIden)]
enum Like {
    TargetType,
    TargetId,
    UserId,
    CreatedAt,
}
