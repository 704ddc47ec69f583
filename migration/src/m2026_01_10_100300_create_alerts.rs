//! Migration to create the alerts table.
//!
//! Alerts are derived records maintained by the threshold engine. A partial
//! unique index guarantees at most one unresolved alert per
//! (entity_ref, alert_type) pair even under concurrent passes.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{DatabaseBackend, Statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Alerts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alerts::EntityKind).text().not_null())
                    .col(ColumnDef::new(Alerts::EntityRef).text().not_null())
                    .col(ColumnDef::new(Alerts::AlertType).text().not_null())
                    .col(ColumnDef::new(Alerts::Severity).text().not_null())
                    .col(
                        ColumnDef::new(Alerts::Status)
                            .text()
                            .not_null()
                            .default("ativo"),
                    )
                    .col(ColumnDef::new(Alerts::Message).text().null())
                    .col(
                        ColumnDef::new(Alerts::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Alerts::ResolutionNote).text().null())
                    .col(
                        ColumnDef::new(Alerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Alerts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        let backend = manager.get_database_backend();
        match backend {
            DatabaseBackend::Postgres => {
                manager
                    .get_connection()
                    .execute(Statement::from_string(
                        backend,
                        "DO $$\nBEGIN\n    IF NOT EXISTS (\n        SELECT 1 FROM pg_indexes\n        WHERE schemaname = current_schema()\n          AND indexname = 'idx_alerts_open_entity_type'\n    ) THEN\n        CREATE UNIQUE INDEX idx_alerts_open_entity_type\n            ON alerts (entity_ref, alert_type)\n            WHERE status <> 'resolvido';\n    END IF;\nEND\n$$;"
                            .to_string(),
                    ))
                    .await?;
            }
            _ => {
                manager
                    .get_connection()
                    .execute(Statement::from_string(
                        backend,
                        "CREATE UNIQUE INDEX IF NOT EXISTS idx_alerts_open_entity_type \
                         ON alerts (entity_ref, alert_type) \
                         WHERE status <> 'resolvido'"
                            .to_string(),
                    ))
                    .await?;
            }
        }

        // Listing open alerts by type/severity is the hot query path.
        manager
            .create_index(
                Index::create()
                    .name("idx_alerts_status_type_severity")
                    .table(Alerts::Table)
                    .col(Alerts::Status)
                    .col(Alerts::AlertType)
                    .col(Alerts::Severity)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "DROP INDEX IF EXISTS idx_alerts_open_entity_type",
            ))
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_alerts_status_type_severity")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    EntityKind,
    EntityRef,
    AlertType,
    Severity,
    Status,
    Message,
    ResolvedAt,
    ResolutionNote,
    CreatedAt,
    UpdatedAt,
}
