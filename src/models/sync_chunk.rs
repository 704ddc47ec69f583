//! SyncChunk entity model
//!
//! Chunks belong to exactly one job (cascade delete) and carry their own
//! slice of raw records, status, and outcome counters so a failed chunk
//! can be retried without re-fetching the window.

use super::sync_job::Entity as SyncJob;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// SyncChunk entity representing one independently-failable slice of a job
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_chunks")]
pub struct Model {
    /// Unique identifier for the chunk (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning job identifier
    pub job_id: Uuid,

    /// Position of this chunk within the job
    pub chunk_index: i32,

    /// Raw record slice assigned to this chunk
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: JsonValue,

    /// Current status (pending, processing, completed, failed)
    pub status: String,

    /// Entities created by this chunk
    pub records_created: i32,

    /// Entities updated by this chunk
    pub records_updated: i32,

    /// State transitions detected by this chunk
    pub records_transitioned: i32,

    /// Records skipped due to mapping/validation failures
    pub record_errors: i32,

    /// Structured error details if the chunk failed
    #[sea_orm(column_type = "JsonBinary")]
    pub error_detail: Option<JsonValue>,

    /// Timestamp when the chunk started execution
    pub started_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the chunk finished execution
    pub finished_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the chunk was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the chunk was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "SyncJob",
        from = "Column::JobId",
        to = "super::sync_job::Column::Id"
    )]
    SyncJob,
}

impl Related<SyncJob> for Entity {
    fn to() -> RelationDef {
        Relation::SyncJob.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
