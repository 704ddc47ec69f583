//! # Server Configuration
//!
//! This module contains the server setup and configuration for the Vigia
//! operator surface.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;
use crate::marketplace::{MarketplaceApi, RequestBudget};
use crate::orchestrator::SyncOrchestrator;
use crate::queue::{TaskQueue, TokioTaskQueue};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub queue: Arc<dyn TaskQueue>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/alerts", get(handlers::alerts::list_alerts))
        .route(
            "/alerts/{id}/resolve",
            post(handlers::alerts::resolve_alert),
        )
        .route(
            "/alerts/{id}/acknowledge",
            post(handlers::alerts::acknowledge_alert),
        )
        .route(
            "/thresholds",
            get(handlers::thresholds::list_thresholds)
                .post(handlers::thresholds::create_threshold),
        )
        .route(
            "/thresholds/{category}",
            put(handlers::thresholds::update_threshold),
        )
        .route("/sync", post(handlers::jobs::trigger_sync))
        .route("/jobs", get(handlers::jobs::list_jobs))
        .route("/jobs/{id}", get(handlers::jobs::get_job))
        .route("/jobs/{id}/cancel", post(handlers::jobs::cancel_job))
        .route("/jobs/{id}/retry", post(handlers::jobs::retry_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(db);

    let budget = RequestBudget::new(&config.rate_limit);
    let api = MarketplaceApi::new(config.marketplace.clone(), budget)?;
    let orchestrator = Arc::new(SyncOrchestrator::new(
        db.clone(),
        api,
        config.sync.clone(),
    ));
    let queue: Arc<dyn TaskQueue> = Arc::new(TokioTaskQueue::new(db.clone(), orchestrator.clone()));

    let state = AppState {
        db,
        queue,
        orchestrator,
    };
    let app = create_app(state);

    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server listening on: {}", addr);
    println!("Running in profile: {}", config.profile);

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::alerts::list_alerts,
        crate::handlers::alerts::resolve_alert,
        crate::handlers::alerts::acknowledge_alert,
        crate::handlers::thresholds::list_thresholds,
        crate::handlers::thresholds::create_threshold,
        crate::handlers::thresholds::update_threshold,
        crate::handlers::jobs::trigger_sync,
        crate::handlers::jobs::get_job,
        crate::handlers::jobs::list_jobs,
        crate::handlers::jobs::cancel_job,
        crate::handlers::jobs::retry_job,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::alerts::AlertInfo,
            crate::handlers::alerts::AlertsResponse,
            crate::handlers::alerts::ResolveAlertRequest,
            crate::handlers::thresholds::ThresholdInfo,
            crate::handlers::thresholds::CreateThresholdRequest,
            crate::handlers::thresholds::UpdateThresholdRequest,
            crate::handlers::jobs::SyncTriggerRequest,
            crate::handlers::jobs::SyncAccepted,
            crate::queue::JobProgress,
        )
    ),
    info(
        title = "Vigia API",
        description = "State synchronization and threshold alerting for marketplace operations",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
