//! Task queue abstraction
//!
//! Background execution is abstracted behind a small contract (enqueue a
//! unit of work, inspect its status) so the concrete runtime, here
//! spawned tokio tasks over persisted jobs, can be swapped without
//! touching callers.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::sync_job::Model as JobModel;
use crate::orchestrator::{SyncOrchestrator, SyncRequest, SyncRunError};
use crate::repositories::SyncJobRepository;

/// Progress snapshot of one job.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobProgress {
    /// Unique identifier of the job
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    /// Type of job
    #[schema(example = "window")]
    pub job_type: String,
    /// Channel scope, if any
    pub channel: Option<String>,
    /// Current lifecycle status
    #[schema(example = "processing")]
    pub status: String,
    /// Records processed so far
    pub current: i32,
    /// Total records in the run
    pub total: i32,
    /// Progress percentage
    pub percentage: f64,
    /// Records that required no database mutation
    pub cache_hits: i32,
    /// Upstream page requests issued
    pub api_calls: i32,
    /// Execution start, RFC 3339
    pub started_at: Option<String>,
    /// Execution finish, RFC 3339
    pub finished_at: Option<String>,
    /// Structured failure detail, when failed
    pub error_detail: Option<serde_json::Value>,
}

impl From<JobModel> for JobProgress {
    fn from(model: JobModel) -> Self {
        Self {
            id: model.id.to_string(),
            job_type: model.job_type,
            channel: model.channel,
            status: model.status,
            current: model.current,
            total: model.total,
            percentage: model.percentage,
            cache_hits: model.cache_hits,
            api_calls: model.api_calls,
            started_at: model.started_at.map(|dt| dt.to_rfc3339()),
            finished_at: model.finished_at.map(|dt| dt.to_rfc3339()),
            error_detail: model.error_detail,
        }
    }
}

/// Contract for independent, inspectable units of background work.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Accept a sync request, returning the persisted job id immediately.
    async fn enqueue(&self, request: SyncRequest) -> Result<Uuid, SyncRunError>;

    /// Inspect the current progress of a job.
    async fn status(&self, job_id: Uuid) -> Result<JobProgress, SyncRunError>;
}

/// Task queue backed by spawned tokio tasks.
pub struct TokioTaskQueue {
    db: Arc<DatabaseConnection>,
    orchestrator: Arc<SyncOrchestrator>,
}

impl TokioTaskQueue {
    pub fn new(db: Arc<DatabaseConnection>, orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self { db, orchestrator }
    }
}

#[async_trait]
impl TaskQueue for TokioTaskQueue {
    async fn enqueue(&self, request: SyncRequest) -> Result<Uuid, SyncRunError> {
        // The guard and job creation happen before returning so the
        // caller gets either a watchable job id or a structured refusal.
        let job = self.orchestrator.prepare(&request).await?;
        let job_id = job.id;

        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            if let Err(err) = orchestrator.execute(job_id, &request).await {
                // The job row already carries the failure detail.
                error!(job_id = %job_id, %err, "Background sync run failed");
            }
        });

        Ok(job_id)
    }

    async fn status(&self, job_id: Uuid) -> Result<JobProgress, SyncRunError> {
        let repo = SyncJobRepository::new(&self.db);
        let job = repo.get(job_id).await?;
        Ok(job.into())
    }
}
