//! Migration to create the threshold_configs table.
//!
//! One row per order-status category, holding the three escalation tiers
//! in hours. Tier ordering (tier_1 < tier_2 < tier_3) is enforced at the
//! application layer so operators get a structured validation error.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ThresholdConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ThresholdConfigs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ThresholdConfigs::Category).text().not_null())
                    .col(
                        ColumnDef::new(ThresholdConfigs::Tier1Hours)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ThresholdConfigs::Tier2Hours)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ThresholdConfigs::Tier3Hours)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ThresholdConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ThresholdConfigs::UpdatedAt)
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
                    .name("idx_threshold_configs_category")
                    .table(ThresholdConfigs::Table)
                    .col(ThresholdConfigs::Category)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_threshold_configs_category")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ThresholdConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ThresholdConfigs {
    Table,
    Id,
    Category,
    #[sea_orm(iden = "tier_1_hours")]
    Tier1Hours,
    #[sea_orm(iden = "tier_2_hours")]
    Tier2Hours,
    #[sea_orm(iden = "tier_3_hours")]
    Tier3Hours,
    CreatedAt,
    UpdatedAt,
}
