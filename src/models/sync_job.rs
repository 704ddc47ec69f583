//! SyncJob entity model
//!
//! This module contains the SeaORM entity model for the sync_jobs table,
//! which records one bulk reconciliation run each: lifecycle status,
//! progress counters, aggregated stats, and structured failure detail.

use super::sync_chunk::Entity as SyncChunk;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// SyncJob entity representing one bulk reconciliation run
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_jobs")]
pub struct Model {
    /// Unique identifier for the sync job (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Type of job (e.g. window, retry)
    pub job_type: String,

    /// Optional channel scope the run was restricted to
    pub channel: Option<String>,

    /// Current status (pending, processing, completed, failed, cancelled)
    pub status: String,

    /// Records processed so far
    pub current: i32,

    /// Total records in this run
    pub total: i32,

    /// Progress percentage derived from current/total
    pub percentage: f64,

    /// Records that required no database mutation
    pub cache_hits: i32,

    /// Upstream page requests issued, including retries
    pub api_calls: i32,

    /// Start of the requested time window
    pub window_start: Option<DateTimeWithTimeZone>,

    /// End of the requested time window
    pub window_end: Option<DateTimeWithTimeZone>,

    /// Timestamp when the job started execution
    pub started_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the job finished execution
    pub finished_at: Option<DateTimeWithTimeZone>,

    /// Structured error details if the job failed
    #[sea_orm(column_type = "JsonBinary")]
    pub error_detail: Option<JsonValue>,

    /// Timestamp when the sync job was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the sync job was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "SyncChunk")]
    SyncChunk,
}

impl Related<SyncChunk> for Entity {
    fn to() -> RelationDef {
        Relation::SyncChunk.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
