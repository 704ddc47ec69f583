//! Bulk job orchestrator integration tests: chunking, partial success,
//! interval guard, cancellation semantics, and narrow retry.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

mod test_utils;
use test_utils::{seed_threshold, setup_test_db, test_marketplace_api};

use vigia::config::SyncConfig;
use vigia::engine::state::{ChunkStatus, JobStatus, OrderState};
use vigia::marketplace::types::OrderWindow;
use vigia::models::sync_chunk;
use vigia::orchestrator::{SyncOrchestrator, SyncRequest, SyncRunError};
use vigia::repositories::{SyncJobRepository, TrackedOrderRepository};

fn wide_window() -> OrderWindow {
    OrderWindow::new(
        "2026-01-01T00:00:00Z".parse().unwrap(),
        "2026-01-31T23:59:59Z".parse().unwrap(),
    )
}

fn request(force: bool) -> SyncRequest {
    SyncRequest {
        window: wide_window(),
        channel: None,
        force,
    }
}

fn sync_config(chunk_size: usize) -> SyncConfig {
    SyncConfig {
        chunk_size,
        min_interval_seconds: 900,
    }
}

async fn mount_pages(mock_server: &MockServer, pages: Vec<Value>, page_size: usize) {
    for (index, body) in pages.into_iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/orders"))
            .and(query_param("skip", (index * page_size).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(mock_server)
            .await;
    }
}

#[tokio::test]
async fn test_window_sync_completes_and_reconciles() {
    let db = Arc::new(setup_test_db().await);
    seed_threshold(&db, OrderState::Processing, 24, 72, 168).await;

    let mock_server = MockServer::start().await;
    mount_pages(
        &mock_server,
        vec![
            json!([
                {"id": 1, "status": "processing"},
                {"id": 2, "status": "shipped"},
                {"id": 3, "status": "delivered"},
            ]),
            json!([]),
        ],
        500,
    )
    .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let orchestrator = SyncOrchestrator::new(db.clone(), api, sync_config(2));

    let job = orchestrator.run_window_sync(request(false)).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed.as_str());
    assert_eq!(job.total, 3);
    assert_eq!(job.current, 3);
    assert_eq!(job.percentage, 100.0);
    assert!(job.api_calls >= 2);
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());

    let chunks = SyncJobRepository::new(&db).chunks_for(job.id).await.unwrap();
    assert_eq!(chunks.len(), 2); // 3 records, chunk size 2
    assert!(
        chunks
            .iter()
            .all(|c| c.status == ChunkStatus::Completed.as_str())
    );

    let orders = TrackedOrderRepository::new(&db);
    assert_eq!(orders.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_chunk_isolation_partial_success() {
    let db = Arc::new(setup_test_db().await);

    // 10 records in chunks of 2; records 5 and 6 (chunk index 2) are
    // unmappable, so that chunk fails while its siblings complete.
    let mut records = Vec::new();
    for id in 1..=10 {
        if id == 5 || id == 6 {
            records.push(json!({"id": id, "status": "not-a-state"}));
        } else {
            records.push(json!({"id": id, "status": "processing"}));
        }
    }

    let mock_server = MockServer::start().await;
    mount_pages(
        &mock_server,
        vec![Value::Array(records), json!([])],
        500,
    )
    .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let orchestrator = SyncOrchestrator::new(db.clone(), api, sync_config(2));

    let result = orchestrator.run_window_sync(request(false)).await;
    let job = result.unwrap();

    assert_eq!(job.status, JobStatus::Failed.as_str());
    assert_eq!(job.current, 10);

    // Failure detail names exactly the failed chunk.
    let detail = job.error_detail.clone().unwrap();
    let failed_chunks = detail["failed_chunks"].as_array().unwrap();
    assert_eq!(failed_chunks.len(), 1);
    assert_eq!(failed_chunks[0]["chunk_index"], 2);

    // Sibling chunks' effects are present: 8 of 10 records reconciled.
    let orders = TrackedOrderRepository::new(&db);
    assert_eq!(orders.count().await.unwrap(), 8);

    let repo = SyncJobRepository::new(&db);
    let chunks = repo.chunks_for(job.id).await.unwrap();
    let failed: Vec<_> = chunks
        .iter()
        .filter(|c| c.status == ChunkStatus::Failed.as_str())
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].chunk_index, 2);
}

#[tokio::test]
async fn test_min_interval_guard_and_force() {
    let db = Arc::new(setup_test_db().await);

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let orchestrator = SyncOrchestrator::new(db.clone(), api, sync_config(250));

    let first = orchestrator.run_window_sync(request(false)).await.unwrap();
    assert_eq!(first.status, JobStatus::Completed.as_str());

    // Immediately re-running without force is refused.
    let refused = orchestrator.run_window_sync(request(false)).await;
    assert!(matches!(refused, Err(SyncRunError::TooSoon { .. })));

    // force=true bypasses the guard.
    let forced = orchestrator.run_window_sync(request(true)).await.unwrap();
    assert_eq!(forced.status, JobStatus::Completed.as_str());
}

#[tokio::test]
async fn test_fetch_failure_marks_job_failed_with_detail() {
    let db = Arc::new(setup_test_db().await);

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("surprise string body")))
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let orchestrator = SyncOrchestrator::new(db.clone(), api, sync_config(250));

    let result = orchestrator.run_window_sync(request(false)).await;
    assert!(matches!(result, Err(SyncRunError::Fetch(_))));

    // The failure is visible as a failed job with structured detail.
    let repo = SyncJobRepository::new(&db);
    let jobs = repo.list(Some(JobStatus::Failed), 10).await.unwrap();
    assert_eq!(jobs.len(), 1);

    let detail = jobs[0].error_detail.clone().unwrap();
    assert_eq!(detail["phase"], "fetch");
    assert_eq!(detail["kind"], "malformed");
    assert_eq!(detail["retryable"], false);
}

#[tokio::test]
async fn test_cancellation_semantics() {
    let db = Arc::new(setup_test_db().await);
    let repo = SyncJobRepository::new(&db);

    let (job, _) = repo
        .create_job("window", None, None, 4, vec![json!([]), json!([])])
        .await
        .unwrap();

    // A pending job can be cancelled.
    assert!(repo.request_cancel(job.id).await.unwrap());
    assert_eq!(
        repo.status_of(job.id).await.unwrap(),
        JobStatus::Cancelled
    );

    // Terminal jobs refuse further cancellation.
    assert!(!repo.request_cancel(job.id).await.unwrap());

    let chunks = repo.chunks_for(job.id).await.unwrap();
    assert!(
        chunks
            .iter()
            .all(|c| c.status == ChunkStatus::Pending.as_str())
    );
}

#[tokio::test]
async fn test_retry_failed_chunks_narrowly() {
    let db = Arc::new(setup_test_db().await);

    // First run: chunk 1 is poisoned (both records unmappable).
    let mock_server = MockServer::start().await;
    mount_pages(
        &mock_server,
        vec![
            json!([
                {"id": 1, "status": "processing"},
                {"id": 2, "status": "processing"},
                {"id": 3, "status": "nope"},
                {"id": 4, "status": "nope"},
            ]),
            json!([]),
        ],
        500,
    )
    .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let orchestrator = SyncOrchestrator::new(db.clone(), api, sync_config(2));

    let job = orchestrator.run_window_sync(request(false)).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed.as_str());

    let repo = SyncJobRepository::new(&db);
    let failed = repo.failed_chunks(job.id).await.unwrap();
    assert_eq!(failed.len(), 1);

    // Upstream fixed its data; simulate by repairing the persisted chunk
    // payload, then retry only the failed chunk.
    let mut active: sync_chunk::ActiveModel = failed[0].clone().into();
    active.payload = Set(json!([
        {"id": 3, "status": "processing"},
        {"id": 4, "status": "processing"},
    ]));
    active.status = Set(ChunkStatus::Failed.as_str().to_string());
    active.update(db.as_ref()).await.unwrap();

    let retried = orchestrator.retry_failed_chunks(job.id).await.unwrap();
    assert_eq!(retried.status, JobStatus::Completed.as_str());

    let orders = TrackedOrderRepository::new(&db);
    assert_eq!(orders.count().await.unwrap(), 4);

    // Completed chunks were not re-run: their finish times predate the
    // retried chunk's.
    let chunks = repo.chunks_for(job.id).await.unwrap();
    assert!(
        chunks
            .iter()
            .all(|c| c.status == ChunkStatus::Completed.as_str())
    );
}
