//! # SyncJob Repository
//!
//! Persistence for bulk reconciliation jobs and their chunks. A job and
//! its chunks are created in one transaction; progress updates flow
//! continuously while the orchestrator works through the chunk list.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::engine::state::{ChunkStatus, JobStatus};
use crate::error::RepositoryError;
use crate::models::sync_chunk::{
    ActiveModel as ChunkActiveModel, Column as ChunkColumn, Entity as ChunkEntity,
    Model as ChunkModel,
};
use crate::models::sync_job::{ActiveModel, Column, Entity, Model};

/// Per-chunk outcome counters recorded on completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkCounters {
    pub created: i32,
    pub updated: i32,
    pub transitioned: i32,
    pub errors: i32,
}

/// Repository for sync job and chunk database operations
pub struct SyncJobRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SyncJobRepository<'a> {
    /// Create a new SyncJobRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a job together with its ordered chunks in one transaction.
    ///
    /// `total` is the number of records across all chunk payloads; each
    /// payload is a JSON array holding that chunk's slice of raw records.
    pub async fn create_job(
        &self,
        job_type: &str,
        channel: Option<String>,
        window: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)>,
        total: i32,
        chunk_payloads: Vec<JsonValue>,
    ) -> Result<(Model, Vec<ChunkModel>), RepositoryError> {
        let txn = self.db.begin().await?;
        let now = Utc::now().fixed_offset();

        let job = ActiveModel {
            id: Set(Uuid::new_v4()),
            job_type: Set(job_type.to_string()),
            channel: Set(channel),
            status: Set(JobStatus::Pending.as_str().to_string()),
            current: Set(0),
            total: Set(total),
            percentage: Set(0.0),
            cache_hits: Set(0),
            api_calls: Set(0),
            window_start: Set(window.map(|(start, _)| start)),
            window_end: Set(window.map(|(_, end)| end)),
            started_at: Set(None),
            finished_at: Set(None),
            error_detail: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let job = job.insert(&txn).await?;

        let mut chunks = Vec::with_capacity(chunk_payloads.len());
        for (index, payload) in chunk_payloads.into_iter().enumerate() {
            let chunk = ChunkActiveModel {
                id: Set(Uuid::new_v4()),
                job_id: Set(job.id),
                chunk_index: Set(index as i32),
                payload: Set(payload),
                status: Set(ChunkStatus::Pending.as_str().to_string()),
                records_created: Set(0),
                records_updated: Set(0),
                records_transitioned: Set(0),
                record_errors: Set(0),
                error_detail: Set(None),
                started_at: Set(None),
                finished_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            };
            chunks.push(chunk.insert(&txn).await?);
        }

        txn.commit().await?;

        tracing::info!(
            job_id = %job.id,
            total,
            chunks = chunks.len(),
            "Sync job created"
        );

        Ok((job, chunks))
    }

    /// Attach chunks to an existing job and set its record total.
    ///
    /// Used when the record set only becomes known after the job row was
    /// created (fetch happens under an already-visible job).
    pub async fn add_chunks(
        &self,
        job_id: Uuid,
        total: i32,
        chunk_payloads: Vec<JsonValue>,
    ) -> Result<Vec<ChunkModel>, RepositoryError> {
        let job = self.get(job_id).await?;
        let txn = self.db.begin().await?;
        let now = Utc::now().fixed_offset();

        let mut chunks = Vec::with_capacity(chunk_payloads.len());
        for (index, payload) in chunk_payloads.into_iter().enumerate() {
            let chunk = ChunkActiveModel {
                id: Set(Uuid::new_v4()),
                job_id: Set(job.id),
                chunk_index: Set(index as i32),
                payload: Set(payload),
                status: Set(ChunkStatus::Pending.as_str().to_string()),
                records_created: Set(0),
                records_updated: Set(0),
                records_transitioned: Set(0),
                record_errors: Set(0),
                error_detail: Set(None),
                started_at: Set(None),
                finished_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            };
            chunks.push(chunk.insert(&txn).await?);
        }

        let mut active: ActiveModel = job.into();
        active.total = Set(total);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        txn.commit().await?;

        Ok(chunks)
    }

    /// Find one job by id
    pub async fn find_by_id(&self, job_id: Uuid) -> Result<Option<Model>, RepositoryError> {
        let job = Entity::find_by_id(job_id).one(self.db).await?;
        Ok(job)
    }

    /// Fetch one job by id, failing if it does not exist
    pub async fn get(&self, job_id: Uuid) -> Result<Model, RepositoryError> {
        self.find_by_id(job_id)
            .await?
            .ok_or(RepositoryError::NotFound {
                entity: "sync job",
                reference: job_id.to_string(),
            })
    }

    /// List jobs, optionally filtered by status, newest first
    pub async fn list(
        &self,
        status: Option<JobStatus>,
        limit: u64,
    ) -> Result<Vec<Model>, RepositoryError> {
        let mut query = Entity::find().order_by_desc(Column::CreatedAt);

        if let Some(status) = status {
            query = query.filter(Column::Status.eq(status.as_str()));
        }

        let jobs = query.limit(limit).all(self.db).await?;
        Ok(jobs)
    }

    /// Current status of a job, re-read from the database.
    ///
    /// The orchestrator polls this between chunks for cooperative
    /// cancellation.
    pub async fn status_of(&self, job_id: Uuid) -> Result<JobStatus, RepositoryError> {
        let job = self.get(job_id).await?;
        JobStatus::parse(&job.status).map_err(|_| RepositoryError::InvalidStoredValue {
            field: "status",
            value: job.status,
        })
    }

    /// Transition a job into processing and stamp its start time
    pub async fn mark_processing(&self, job_id: Uuid) -> Result<Model, RepositoryError> {
        let job = self.get(job_id).await?;
        let now = Utc::now().fixed_offset();

        let mut active: ActiveModel = job.into();
        active.status = Set(JobStatus::Processing.as_str().to_string());
        active.started_at = Set(Some(now));
        active.updated_at = Set(now);

        let updated = active.update(self.db).await?;
        Ok(updated)
    }

    /// Update progress counters; percentage is derived from current/total
    pub async fn update_progress(
        &self,
        job_id: Uuid,
        current: i32,
        cache_hits: i32,
    ) -> Result<Model, RepositoryError> {
        let job = self.get(job_id).await?;
        let total = job.total;
        let percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            100.0
        };

        let mut active: ActiveModel = job.into();
        active.current = Set(current);
        active.percentage = Set(percentage);
        active.cache_hits = Set(cache_hits);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(self.db).await?;
        Ok(updated)
    }

    /// Record the number of upstream page requests attributed to this job
    pub async fn record_api_calls(
        &self,
        job_id: Uuid,
        api_calls: i32,
    ) -> Result<Model, RepositoryError> {
        let job = self.get(job_id).await?;

        let mut active: ActiveModel = job.into();
        active.api_calls = Set(api_calls);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(self.db).await?;
        Ok(updated)
    }

    /// Finalize a job with the given terminal status and optional detail
    pub async fn finalize(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error_detail: Option<JsonValue>,
    ) -> Result<Model, RepositoryError> {
        let job = self.get(job_id).await?;
        let now = Utc::now().fixed_offset();

        let mut active: ActiveModel = job.into();
        active.status = Set(status.as_str().to_string());
        active.finished_at = Set(Some(now));
        active.error_detail = Set(error_detail);
        active.updated_at = Set(now);

        let finalized = active.update(self.db).await?;

        tracing::info!(job_id = %finalized.id, status = status.as_str(), "Sync job finalized");

        Ok(finalized)
    }

    /// Request cancellation of a job.
    ///
    /// Returns false when the job already reached a terminal state.
    /// In-flight chunk work observes the new status between chunks.
    pub async fn request_cancel(&self, job_id: Uuid) -> Result<bool, RepositoryError> {
        let job = self.get(job_id).await?;
        let status = JobStatus::parse(&job.status).map_err(|_| {
            RepositoryError::InvalidStoredValue {
                field: "status",
                value: job.status.clone(),
            }
        })?;

        if status.is_terminal() {
            return Ok(false);
        }

        let mut active: ActiveModel = job.into();
        active.status = Set(JobStatus::Cancelled.as_str().to_string());
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(self.db).await?;

        Ok(true)
    }

    /// Finish time of the most recently completed job, for the
    /// minimum-interval guard
    pub async fn last_completed_at(
        &self,
    ) -> Result<Option<DateTime<FixedOffset>>, RepositoryError> {
        let job = Entity::find()
            .filter(Column::Status.eq(JobStatus::Completed.as_str()))
            .order_by_desc(Column::FinishedAt)
            .one(self.db)
            .await?;

        Ok(job.and_then(|j| j.finished_at))
    }

    /// All chunks of a job in execution order
    pub async fn chunks_for(&self, job_id: Uuid) -> Result<Vec<ChunkModel>, RepositoryError> {
        let chunks = ChunkEntity::find()
            .filter(ChunkColumn::JobId.eq(job_id))
            .order_by_asc(ChunkColumn::ChunkIndex)
            .all(self.db)
            .await?;

        Ok(chunks)
    }

    /// Failed chunks of a job in execution order
    pub async fn failed_chunks(&self, job_id: Uuid) -> Result<Vec<ChunkModel>, RepositoryError> {
        let chunks = ChunkEntity::find()
            .filter(ChunkColumn::JobId.eq(job_id))
            .filter(ChunkColumn::Status.eq(ChunkStatus::Failed.as_str()))
            .order_by_asc(ChunkColumn::ChunkIndex)
            .all(self.db)
            .await?;

        Ok(chunks)
    }

    /// Transition a chunk into processing
    pub async fn mark_chunk_processing(
        &self,
        chunk: ChunkModel,
    ) -> Result<ChunkModel, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let mut active: ChunkActiveModel = chunk.into();
        active.status = Set(ChunkStatus::Processing.as_str().to_string());
        active.started_at = Set(Some(now));
        active.updated_at = Set(now);

        let updated = active.update(self.db).await?;
        Ok(updated)
    }

    /// Record a successful chunk with its outcome counters
    pub async fn complete_chunk(
        &self,
        chunk: ChunkModel,
        counters: ChunkCounters,
    ) -> Result<ChunkModel, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let mut active: ChunkActiveModel = chunk.into();
        active.status = Set(ChunkStatus::Completed.as_str().to_string());
        active.records_created = Set(counters.created);
        active.records_updated = Set(counters.updated);
        active.records_transitioned = Set(counters.transitioned);
        active.record_errors = Set(counters.errors);
        active.finished_at = Set(Some(now));
        active.updated_at = Set(now);

        let completed = active.update(self.db).await?;
        Ok(completed)
    }

    /// Record a failed chunk with structured error detail
    pub async fn fail_chunk(
        &self,
        chunk: ChunkModel,
        error_detail: JsonValue,
    ) -> Result<ChunkModel, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let mut active: ChunkActiveModel = chunk.into();
        active.status = Set(ChunkStatus::Failed.as_str().to_string());
        active.error_detail = Set(Some(error_detail));
        active.finished_at = Set(Some(now));
        active.updated_at = Set(now);

        let failed = active.update(self.db).await?;
        Ok(failed)
    }
}
