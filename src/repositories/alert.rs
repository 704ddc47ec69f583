//! # Alert Repository
//!
//! The durable ledger of alert records. All writes funnel through here so
//! the open-alert uniqueness invariant (at most one row with
//! `status != resolvido` per (entity_ref, alert_type)) has a single
//! enforcement point, backed by a partial unique index.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::engine::state::{AlertStatus, AlertType, Severity};
use crate::error::RepositoryError;
use crate::models::alert::{ActiveModel, Column, Entity, Model};

/// Filters for listing alerts on the operator surface.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub alert_type: Option<String>,
    pub severity: Option<Severity>,
    pub entity_ref: Option<String>,
    pub status: Option<AlertStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Repository for alert database operations
pub struct AlertRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> AlertRepository<'a> {
    /// Create a new AlertRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find the open (unresolved) alert for an entity and alert type, if any
    pub async fn find_open(
        &self,
        entity_ref: &str,
        alert_type: &AlertType,
    ) -> Result<Option<Model>, RepositoryError> {
        let alert = Entity::find()
            .filter(Column::EntityRef.eq(entity_ref))
            .filter(Column::AlertType.eq(alert_type.key()))
            .filter(Column::Status.ne(AlertStatus::Resolvido.as_str()))
            .one(self.db)
            .await?;

        Ok(alert)
    }

    /// List alerts matching the given filter; unresolved alerts when no
    /// status filter is given
    pub async fn list(&self, filter: AlertFilter) -> Result<Vec<Model>, RepositoryError> {
        let mut query = Entity::find().order_by_desc(Column::CreatedAt);

        match filter.status {
            Some(status) => {
                query = query.filter(Column::Status.eq(status.as_str()));
            }
            None => {
                query = query.filter(Column::Status.ne(AlertStatus::Resolvido.as_str()));
            }
        }

        if let Some(alert_type) = filter.alert_type {
            query = query.filter(Column::AlertType.eq(alert_type));
        }

        if let Some(severity) = filter.severity {
            query = query.filter(Column::Severity.eq(severity.as_str()));
        }

        if let Some(entity_ref) = filter.entity_ref {
            query = query.filter(Column::EntityRef.eq(entity_ref));
        }

        let alerts = query
            .offset(filter.offset.unwrap_or(0))
            .limit(filter.limit.unwrap_or(50))
            .all(self.db)
            .await?;

        Ok(alerts)
    }

    /// Find one alert by id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        let alert = Entity::find_by_id(id).one(self.db).await?;
        Ok(alert)
    }

    /// Create a new active alert
    pub async fn create(
        &self,
        alert_type: &AlertType,
        entity_ref: &str,
        severity: Severity,
        message: Option<String>,
    ) -> Result<Model, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let alert = ActiveModel {
            id: Set(Uuid::new_v4()),
            entity_kind: Set(alert_type.entity_kind().as_str().to_string()),
            entity_ref: Set(entity_ref.to_string()),
            alert_type: Set(alert_type.key()),
            severity: Set(severity.as_str().to_string()),
            status: Set(AlertStatus::Ativo.as_str().to_string()),
            message: Set(message),
            resolved_at: Set(None),
            resolution_note: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = alert.insert(self.db).await?;

        tracing::info!(
            alert_id = %inserted.id,
            entity_ref,
            alert_type = %inserted.alert_type,
            severity = severity.as_str(),
            "Alert created"
        );

        Ok(inserted)
    }

    /// Change the severity of an open alert in place (no new row)
    pub async fn update_severity(
        &self,
        alert: Model,
        severity: Severity,
    ) -> Result<Model, RepositoryError> {
        let previous = alert.severity.clone();
        let mut active: ActiveModel = alert.into();
        active.severity = Set(severity.as_str().to_string());
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(self.db).await?;

        tracing::info!(
            alert_id = %updated.id,
            from = %previous,
            to = severity.as_str(),
            "Alert severity changed"
        );

        Ok(updated)
    }

    /// Resolve an alert with the given note.
    ///
    /// Used for both automatic resolution (system-generated note) and the
    /// operator resolve mutation.
    pub async fn resolve(
        &self,
        alert: Model,
        note: Option<String>,
    ) -> Result<Model, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let mut active: ActiveModel = alert.into();
        active.status = Set(AlertStatus::Resolvido.as_str().to_string());
        active.resolved_at = Set(Some(now));
        active.resolution_note = Set(note);
        active.updated_at = Set(now);

        let resolved = active.update(self.db).await?;

        tracing::info!(alert_id = %resolved.id, "Alert resolved");

        Ok(resolved)
    }

    /// Mark an active alert as acknowledged (lido).
    ///
    /// Acknowledged alerts still escalate and auto-resolve; only
    /// `resolvido` is immune from automatic transitions.
    pub async fn acknowledge(&self, alert: Model) -> Result<Model, RepositoryError> {
        let mut active: ActiveModel = alert.into();
        active.status = Set(AlertStatus::Lido.as_str().to_string());
        active.updated_at = Set(Utc::now().fixed_offset());

        let acknowledged = active.update(self.db).await?;
        Ok(acknowledged)
    }

    /// Count unresolved alerts
    pub async fn count_open(&self) -> Result<u64, RepositoryError> {
        let count = Entity::find()
            .filter(Column::Status.ne(AlertStatus::Resolvido.as_str()))
            .count(self.db)
            .await?;

        Ok(count)
    }

    /// List unresolved alerts for one entity across all alert types
    pub async fn list_open_for_entity(
        &self,
        entity_ref: &str,
    ) -> Result<Vec<Model>, RepositoryError> {
        let alerts = Entity::find()
            .filter(Column::EntityRef.eq(entity_ref))
            .filter(Column::Status.ne(AlertStatus::Resolvido.as_str()))
            .all(self.db)
            .await?;

        Ok(alerts)
    }
}
