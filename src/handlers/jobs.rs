//! # Sync & Jobs API Handlers
//!
//! Trigger bulk sync runs and inspect, cancel, or narrowly retry the
//! resulting jobs.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::state::JobStatus;
use crate::error::ApiError;
use crate::marketplace::types::OrderWindow;
use crate::orchestrator::SyncRequest;
use crate::queue::{JobProgress, TaskQueue};
use crate::repositories::SyncJobRepository;
use crate::server::AppState;

/// Request body for triggering a sync run
#[derive(Debug, Deserialize, ToSchema)]
pub struct SyncTriggerRequest {
    /// Window start, RFC 3339
    #[schema(example = "2026-01-01T00:00:00Z")]
    pub start: String,
    /// Window end, RFC 3339
    #[schema(example = "2026-01-31T23:59:59Z")]
    pub end: String,
    /// Optional channel scope
    #[schema(example = "mlb")]
    pub channel: Option<String>,
    /// Bypass the minimum-interval guard
    #[serde(default)]
    pub force: bool,
}

/// Response payload for an accepted sync trigger
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncAccepted {
    /// Identifier of the created job
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub job_id: String,
}

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    /// Filter by job status (pending, processing, completed, failed, cancelled)
    pub status: Option<String>,
    /// Maximum number of jobs to return (default: 50)
    pub limit: Option<u64>,
}

fn parse_instant(value: &str, field: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                &format!("invalid {} timestamp: {}", field, err),
            )
        })
}

/// Trigger a bulk sync for a time window
#[utoipa::path(
    post,
    path = "/sync",
    request_body = SyncTriggerRequest,
    responses(
        (status = 202, description = "Sync job accepted", body = SyncAccepted),
        (status = 400, description = "Invalid window", body = ApiError),
        (status = 409, description = "A sync completed too recently", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn trigger_sync(
    State(state): State<AppState>,
    Json(request): Json<SyncTriggerRequest>,
) -> Result<(StatusCode, Json<SyncAccepted>), ApiError> {
    let start = parse_instant(&request.start, "start")?;
    let end = parse_instant(&request.end, "end")?;

    if end < start {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "window end precedes window start",
        ));
    }

    let job_id = state
        .queue
        .enqueue(SyncRequest {
            window: OrderWindow::new(start, end),
            channel: request.channel,
            force: request.force,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncAccepted {
            job_id: job_id.to_string(),
        }),
    ))
}

/// Get one job's progress
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(("id" = String, Path, description = "Job identifier")),
    responses(
        (status = 200, description = "Job progress", body = JobProgress),
        (status = 404, description = "Job not found", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobProgress>, ApiError> {
    let progress = state.queue.status(id).await?;
    Ok(Json(progress))
}

/// List jobs, newest first
#[utoipa::path(
    get,
    path = "/jobs",
    params(
        ("status" = Option<String>, Query, description = "Filter by job status"),
        ("limit" = Option<u64>, Query, description = "Page size, default 50"),
    ),
    responses(
        (status = 200, description = "Jobs matching the query", body = [JobProgress]),
        (status = 400, description = "Invalid status value", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobProgress>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(JobStatus::parse)
        .transpose()
        .map_err(|err| {
            ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &err.to_string())
        })?;

    let repo = SyncJobRepository::new(&state.db);
    let jobs = repo.list(status, query.limit.unwrap_or(50)).await?;

    Ok(Json(jobs.into_iter().map(JobProgress::from).collect()))
}

/// Request cancellation of a running job
#[utoipa::path(
    post,
    path = "/jobs/{id}/cancel",
    params(("id" = String, Path, description = "Job identifier")),
    responses(
        (status = 200, description = "Cancellation requested", body = JobProgress),
        (status = 404, description = "Job not found", body = ApiError),
        (status = 409, description = "Job already finished", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobProgress>, ApiError> {
    let repo = SyncJobRepository::new(&state.db);

    let cancelled = repo.request_cancel(id).await?;
    if !cancelled {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "CONFLICT",
            "Job already reached a terminal state",
        ));
    }

    let job = repo.get(id).await?;
    Ok(Json(job.into()))
}

/// Retry only the failed chunks of a failed job
#[utoipa::path(
    post,
    path = "/jobs/{id}/retry",
    params(("id" = String, Path, description = "Job identifier")),
    responses(
        (status = 202, description = "Retry started", body = JobProgress),
        (status = 404, description = "Job not found or not failed", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn retry_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<JobProgress>), ApiError> {
    let repo = SyncJobRepository::new(&state.db);
    let job = repo.get(id).await?;

    if job.status != JobStatus::Failed.as_str() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Only failed jobs can be retried",
        ));
    }

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(err) = orchestrator.retry_failed_chunks(id).await {
            tracing::error!(job_id = %id, %err, "Chunk retry failed");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(job.into())))
}
