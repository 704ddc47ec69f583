//! Bulk Sync Orchestrator
//!
//! Runs one reconciliation pass over a time window as a persisted job:
//! fetch, split into independently-failable chunks, reconcile each chunk,
//! converge alerts, finalize. One chunk's failure never blocks its
//! siblings and completed chunks' effects are never rolled back; the
//! job's final status is a deterministic function of its chunks'
//! statuses, with failure detail precise enough to retry only what
//! failed.

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use serde_json::{Value as JsonValue, json};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::engine::state::{ChunkStatus, JobStatus};
use crate::engine::{ReconcileOutcome, Reconciler, ThresholdAlertEngine};
use crate::error::{ApiError, RepositoryError};
use crate::marketplace::types::OrderWindow;
use crate::marketplace::{FetchError, MarketplaceApi, OrderFetcher};
use crate::models::sync_chunk::Model as ChunkModel;
use crate::models::sync_job::Model as JobModel;
use crate::repositories::SyncJobRepository;
use crate::repositories::sync_job::ChunkCounters;

/// Channel assigned to records that do not carry their own.
const DEFAULT_CHANNEL: &str = "default";

/// Job type recorded for window reconciliation runs.
const JOB_TYPE_WINDOW: &str = "window";

/// One sync invocation: synchronize `window` for `channel`, with `force`
/// bypassing the minimum-interval guard.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub window: OrderWindow,
    pub channel: Option<String>,
    pub force: bool,
}

/// Errors that mark a whole run as failed (chunk and record errors are
/// recovered locally and never reach this level).
#[derive(Debug, Error)]
pub enum SyncRunError {
    #[error(
        "sync skipped: last completed run finished {elapsed_seconds}s ago (minimum interval {min_interval_seconds}s)"
    )]
    TooSoon {
        elapsed_seconds: i64,
        min_interval_seconds: u64,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<SyncRunError> for ApiError {
    fn from(error: SyncRunError) -> Self {
        match error {
            SyncRunError::TooSoon {
                elapsed_seconds,
                min_interval_seconds,
            } => {
                let retry_after = (min_interval_seconds as i64 - elapsed_seconds).max(0) as u64;
                ApiError::new(
                    StatusCode::CONFLICT,
                    "SYNC_TOO_SOON",
                    "A sync completed recently; pass force=true to bypass the interval guard",
                )
                .with_retry_after(retry_after)
            }
            SyncRunError::Fetch(err) => err.into(),
            SyncRunError::Repository(err) => err.into(),
        }
    }
}

/// Orchestrator wrapping the fetcher + reconciler pair for catalog-scale
/// passes.
pub struct SyncOrchestrator {
    db: Arc<DatabaseConnection>,
    api: MarketplaceApi,
    config: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(db: Arc<DatabaseConnection>, api: MarketplaceApi, config: SyncConfig) -> Self {
        Self { db, api, config }
    }

    /// Apply the minimum-interval guard and create the job row.
    ///
    /// The job is visible (status pending) before any upstream traffic,
    /// so callers can watch progress from the start.
    pub async fn prepare(&self, request: &SyncRequest) -> Result<JobModel, SyncRunError> {
        let repo = SyncJobRepository::new(&self.db);

        if !request.force
            && let Some(last_finished) = repo.last_completed_at().await?
        {
            let elapsed = Utc::now()
                .fixed_offset()
                .signed_duration_since(last_finished)
                .num_seconds();
            if elapsed < self.config.min_interval_seconds as i64 {
                counter!("sync_runs_skipped_total").increment(1);
                return Err(SyncRunError::TooSoon {
                    elapsed_seconds: elapsed,
                    min_interval_seconds: self.config.min_interval_seconds,
                });
            }
        }

        let window = (
            request.window.start.fixed_offset(),
            request.window.end.fixed_offset(),
        );
        let (job, _) = repo
            .create_job(
                JOB_TYPE_WINDOW,
                request.channel.clone(),
                Some(window),
                0,
                Vec::new(),
            )
            .await?;

        Ok(job)
    }

    /// Execute a prepared job to completion or failure.
    #[instrument(skip(self, request), fields(job_id = %job_id))]
    pub async fn execute(
        &self,
        job_id: Uuid,
        request: &SyncRequest,
    ) -> Result<JobModel, SyncRunError> {
        let started = std::time::Instant::now();
        let repo = SyncJobRepository::new(&self.db);

        repo.mark_processing(job_id).await?;

        let fetcher = OrderFetcher::new(self.api.clone());
        let report = match fetcher
            .fetch_all(&request.window, request.channel.as_deref())
            .await
        {
            Ok(report) => report,
            Err(err) => {
                // Exhausted retries or a malformed page: the run fails,
                // with detail precise enough to retry the window.
                let detail = json!({
                    "phase": "fetch",
                    "kind": err.kind_label(),
                    "message": err.to_string(),
                    "retryable": err.is_retryable(),
                });
                repo.finalize(job_id, JobStatus::Failed, Some(detail)).await?;
                counter!("sync_runs_failed_total").increment(1);
                return Err(err.into());
            }
        };

        repo.record_api_calls(job_id, report.api_calls as i32).await?;

        if report.truncated {
            warn!(job_id = %job_id, "Fetch hit the page cap; window may be truncated");
        }

        let total = report.records.len();
        let chunk_payloads: Vec<JsonValue> = report
            .records
            .chunks(self.config.chunk_size)
            .map(|slice| JsonValue::Array(slice.to_vec()))
            .collect();

        repo.add_chunks(job_id, total as i32, chunk_payloads).await?;

        let cancelled = self.execute_chunks(job_id, request).await?;

        if !cancelled {
            // Converge the alert ledger against the refreshed mirror while
            // the run is still attributable to this job.
            let engine = ThresholdAlertEngine::new(&self.db);
            if let Err(err) = engine.run_order_pass().await {
                let detail = json!({
                    "phase": "alerts",
                    "message": err.to_string(),
                });
                repo.finalize(job_id, JobStatus::Failed, Some(detail)).await?;
                counter!("sync_runs_failed_total").increment(1);
                return Err(err.into());
            }
        }

        let job = self.finalize_from_chunks(job_id).await?;

        histogram!("sync_run_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(
            job_id = %job.id,
            status = %job.status,
            total = job.total,
            "Sync run finished"
        );

        Ok(job)
    }

    /// Convenience wrapper: prepare and execute in one call (CLI path).
    pub async fn run_window_sync(&self, request: SyncRequest) -> Result<JobModel, SyncRunError> {
        let job = self.prepare(&request).await?;
        self.execute(job.id, &request).await
    }

    /// Re-run only the failed chunks of a failed job, then re-finalize it.
    ///
    /// Completed chunks are untouched; their effects were never rolled
    /// back.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn retry_failed_chunks(&self, job_id: Uuid) -> Result<JobModel, SyncRunError> {
        let repo = SyncJobRepository::new(&self.db);
        let job = repo.get(job_id).await?;

        let status = JobStatus::parse(&job.status).map_err(|_| {
            RepositoryError::InvalidStoredValue {
                field: "status",
                value: job.status.clone(),
            }
        })?;

        if status != JobStatus::Failed {
            return Err(RepositoryError::NotFound {
                entity: "failed sync job",
                reference: job_id.to_string(),
            }
            .into());
        }

        let failed = repo.failed_chunks(job_id).await?;
        info!(job_id = %job_id, chunks = failed.len(), "Retrying failed chunks");

        repo.mark_processing(job_id).await?;

        // Progress for the retried chunks is re-earned, not double-counted.
        let retried_records: i32 = failed
            .iter()
            .map(|c| c.payload.as_array().map_or(0, |r| r.len() as i32))
            .sum();
        let job = repo.get(job_id).await?;
        repo.update_progress(
            job_id,
            (job.current - retried_records).max(0),
            job.cache_hits,
        )
        .await?;

        for chunk in failed {
            self.run_one_chunk(&repo, chunk, job.channel.as_deref()).await?;
        }

        let job = self.finalize_from_chunks(job_id).await?;
        Ok(job)
    }

    /// Work through pending chunks in order, updating progress after each.
    /// Returns true when the run stopped on a cancellation request.
    async fn execute_chunks(
        &self,
        job_id: Uuid,
        request: &SyncRequest,
    ) -> Result<bool, SyncRunError> {
        let repo = SyncJobRepository::new(&self.db);
        let chunks = repo.chunks_for(job_id).await?;

        for chunk in chunks {
            if ChunkStatus::parse(&chunk.status) != Ok(ChunkStatus::Pending) {
                continue;
            }

            // Cooperative cancellation: re-read the job status between
            // chunks and stop dispatching; completed chunks keep their
            // effects.
            if repo.status_of(job_id).await? == JobStatus::Cancelled {
                info!(job_id = %job_id, "Cancellation observed, stopping chunk dispatch");
                return Ok(true);
            }

            self.run_one_chunk(&repo, chunk, request.channel.as_deref())
                .await?;
        }

        Ok(false)
    }

    /// Execute a single chunk, isolating its failure to its own row.
    async fn run_one_chunk(
        &self,
        repo: &SyncJobRepository<'_>,
        chunk: ChunkModel,
        channel: Option<&str>,
    ) -> Result<(), SyncRunError> {
        let job_id = chunk.job_id;
        let chunk_index = chunk.chunk_index;
        let chunk = repo.mark_chunk_processing(chunk).await?;

        let records: Vec<JsonValue> = chunk
            .payload
            .as_array()
            .cloned()
            .unwrap_or_default();
        let record_count = records.len();

        let reconciler = Reconciler::new(&self.db, channel.unwrap_or(DEFAULT_CHANNEL));

        match self.reconcile_chunk(&reconciler, &records).await {
            Ok(outcome) => {
                repo.complete_chunk(
                    chunk,
                    ChunkCounters {
                        created: outcome.created as i32,
                        updated: outcome.updated as i32,
                        transitioned: outcome.transitioned as i32,
                        errors: outcome.errors as i32,
                    },
                )
                .await?;
                counter!("sync_chunks_completed_total").increment(1);

                let job = repo.get(job_id).await?;
                repo.update_progress(
                    job_id,
                    job.current + record_count as i32,
                    job.cache_hits + outcome.unchanged as i32,
                )
                .await?;
            }
            Err(detail) => {
                warn!(job_id = %job_id, chunk_index, "Chunk failed");
                counter!("sync_chunks_failed_total").increment(1);
                repo.fail_chunk(chunk, detail).await?;

                let job = repo.get(job_id).await?;
                repo.update_progress(job_id, job.current + record_count as i32, job.cache_hits)
                    .await?;
            }
        }

        Ok(())
    }

    /// Reconcile one chunk's records, deciding between chunk success and
    /// chunk failure.
    ///
    /// Individual bad records are counted and skipped inside the
    /// reconciler; the chunk itself fails only when nothing in it could be
    /// processed, or on a systemic persistence error.
    async fn reconcile_chunk(
        &self,
        reconciler: &Reconciler<'_>,
        records: &[JsonValue],
    ) -> Result<ReconcileOutcome, JsonValue> {
        match reconciler.reconcile(records).await {
            Ok(outcome) => {
                if !records.is_empty() && outcome.errors as usize == records.len() {
                    return Err(json!({
                        "reason": "all_records_failed",
                        "record_errors": outcome.errors,
                    }));
                }
                Ok(outcome)
            }
            Err(err) => Err(json!({
                "reason": "persistence_error",
                "message": err.to_string(),
            })),
        }
    }

    /// Derive the job's terminal status from its chunks' statuses.
    async fn finalize_from_chunks(&self, job_id: Uuid) -> Result<JobModel, SyncRunError> {
        let repo = SyncJobRepository::new(&self.db);

        if repo.status_of(job_id).await? == JobStatus::Cancelled {
            // Stamp finished_at; completed chunks' effects stay intact.
            let job = repo.finalize(job_id, JobStatus::Cancelled, None).await?;
            return Ok(job);
        }

        let chunks = repo.chunks_for(job_id).await?;
        let failed: Vec<&ChunkModel> = chunks
            .iter()
            .filter(|c| ChunkStatus::parse(&c.status) == Ok(ChunkStatus::Failed))
            .collect();

        let job = if failed.is_empty() {
            counter!("sync_runs_completed_total").increment(1);
            repo.finalize(job_id, JobStatus::Completed, None).await?
        } else {
            // Partial success: enumerate exactly which chunks failed and
            // why, so a narrow retry is possible.
            let detail = json!({
                "phase": "chunks",
                "failed_chunks": failed
                    .iter()
                    .map(|c| json!({
                        "chunk_index": c.chunk_index,
                        "error": c.error_detail,
                    }))
                    .collect::<Vec<_>>(),
            });
            counter!("sync_runs_failed_total").increment(1);
            repo.finalize(job_id, JobStatus::Failed, Some(detail)).await?
        };

        Ok(job)
    }
}
