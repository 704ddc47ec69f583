//! Migration to create the tracked_orders table.
//!
//! Tracked orders mirror marketplace orders and carry the timestamp of the
//! last status change, which drives time-in-state alerting.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrackedOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackedOrders::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrackedOrders::ExternalId).text().not_null())
                    .col(ColumnDef::new(TrackedOrders::Channel).text().not_null())
                    .col(ColumnDef::new(TrackedOrders::Status).text().not_null())
                    .col(
                        ColumnDef::new(TrackedOrders::StatusEnteredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrackedOrders::Buyer).text().null())
                    .col(ColumnDef::new(TrackedOrders::TotalAmount).double().null())
                    .col(ColumnDef::new(TrackedOrders::Currency).text().null())
                    .col(
                        ColumnDef::new(TrackedOrders::OrderCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(TrackedOrders::Payload).json_binary().null())
                    .col(
                        ColumnDef::new(TrackedOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TrackedOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracked_orders_channel_external_id")
                    .table(TrackedOrders::Table)
                    .col(TrackedOrders::Channel)
                    .col(TrackedOrders::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Status scans drive the alert pass over non-terminal orders.
        manager
            .create_index(
                Index::create()
                    .name("idx_tracked_orders_status")
                    .table(TrackedOrders::Table)
                    .col(TrackedOrders::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_tracked_orders_channel_external_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_tracked_orders_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(TrackedOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TrackedOrders {
    Table,
    Id,
    ExternalId,
    Channel,
    Status,
    StatusEnteredAt,
    Buyer,
    TotalAmount,
    Currency,
    OrderCreatedAt,
    Payload,
    CreatedAt,
    UpdatedAt,
}
