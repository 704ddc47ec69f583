//! Migration to create the sync_chunks table.
//!
//! Chunks belong to exactly one job and are deleted with it. Each chunk
//! stores its own slice of raw records so failed chunks can be retried
//! without re-fetching the window.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncChunks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncChunks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncChunks::JobId).uuid().not_null())
                    .col(ColumnDef::new(SyncChunks::ChunkIndex).integer().not_null())
                    .col(ColumnDef::new(SyncChunks::Payload).json_binary().not_null())
                    .col(
                        ColumnDef::new(SyncChunks::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(SyncChunks::RecordsCreated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncChunks::RecordsUpdated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncChunks::RecordsTransitioned)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncChunks::RecordErrors)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncChunks::ErrorDetail).json_binary().null())
                    .col(
                        ColumnDef::new(SyncChunks::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncChunks::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncChunks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncChunks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sync_chunks_job_id")
                            .from(SyncChunks::Table, SyncChunks::JobId)
                            .to(SyncJobs::Table, SyncJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_chunks_job_index")
                    .table(SyncChunks::Table)
                    .col(SyncChunks::JobId)
                    .col(SyncChunks::ChunkIndex)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sync_chunks_job_index").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SyncChunks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncChunks {
    Table,
    Id,
    JobId,
    ChunkIndex,
    Payload,
    Status,
    RecordsCreated,
    RecordsUpdated,
    RecordsTransitioned,
    RecordErrors,
    ErrorDetail,
    StartedAt,
    FinishedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SyncJobs {
    Table,
    Id,
}
