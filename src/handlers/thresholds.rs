//! # Threshold Configuration Handlers
//!
//! CRUD over per-category escalation tiers. Tier ordering is validated
//! here so operators get a structured 400 instead of a database error.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::engine::state::OrderState;
use crate::error::{ApiError, validation_error};
use crate::models::threshold_config;
use crate::repositories::ThresholdConfigRepository;
use crate::repositories::threshold_config::{ThresholdTiers, validate_tiers};
use crate::server::AppState;

/// Threshold configuration response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThresholdInfo {
    /// Order-status category this row configures
    #[schema(example = "processing")]
    pub category: String,
    /// Hours in state before a yellow alert
    #[schema(example = 24)]
    pub tier_1_hours: i32,
    /// Hours in state before escalation to red
    #[schema(example = 72)]
    pub tier_2_hours: i32,
    /// Hours in state before escalation to critical
    #[schema(example = 168)]
    pub tier_3_hours: i32,
}

impl From<threshold_config::Model> for ThresholdInfo {
    fn from(model: threshold_config::Model) -> Self {
        Self {
            category: model.category,
            tier_1_hours: model.tier_1_hours,
            tier_2_hours: model.tier_2_hours,
            tier_3_hours: model.tier_3_hours,
        }
    }
}

/// Request body for creating a threshold configuration
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateThresholdRequest {
    /// Order-status category (must be a known state key)
    pub category: String,
    pub tier_1_hours: i32,
    pub tier_2_hours: i32,
    pub tier_3_hours: i32,
}

/// Request body for updating a threshold configuration
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateThresholdRequest {
    pub tier_1_hours: i32,
    pub tier_2_hours: i32,
    pub tier_3_hours: i32,
}

fn parse_category(category: &str) -> Result<OrderState, ApiError> {
    OrderState::parse(category).map_err(|err| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            &err.to_string(),
        )
    })
}

fn check_tiers(tiers: ThresholdTiers) -> Result<ThresholdTiers, ApiError> {
    validate_tiers(tiers).map_err(|err| {
        validation_error(
            "Invalid threshold tiers",
            json!({"tiers": err.to_string()}),
        )
    })?;
    Ok(tiers)
}

/// List all threshold configurations
#[utoipa::path(
    get,
    path = "/thresholds",
    responses(
        (status = 200, description = "Configured thresholds", body = [ThresholdInfo])
    ),
    tag = "thresholds"
)]
pub async fn list_thresholds(
    State(state): State<AppState>,
) -> Result<Json<Vec<ThresholdInfo>>, ApiError> {
    let repo = ThresholdConfigRepository::new(&state.db);
    let configs = repo.list_all().await?;

    Ok(Json(configs.into_iter().map(ThresholdInfo::from).collect()))
}

/// Create a threshold configuration for a category
#[utoipa::path(
    post,
    path = "/thresholds",
    request_body = CreateThresholdRequest,
    responses(
        (status = 201, description = "Threshold created", body = ThresholdInfo),
        (status = 400, description = "Invalid category or tiers", body = ApiError),
        (status = 409, description = "Category already configured", body = ApiError)
    ),
    tag = "thresholds"
)]
pub async fn create_threshold(
    State(state): State<AppState>,
    Json(request): Json<CreateThresholdRequest>,
) -> Result<(StatusCode, Json<ThresholdInfo>), ApiError> {
    let category = parse_category(&request.category)?;
    let tiers = check_tiers(ThresholdTiers::new(
        request.tier_1_hours,
        request.tier_2_hours,
        request.tier_3_hours,
    ))?;

    let repo = ThresholdConfigRepository::new(&state.db);

    if repo.find_by_category(category.as_str()).await?.is_some() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "CONFLICT",
            "Category already configured",
        ));
    }

    let created = repo.create(category, tiers).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update the tiers for an existing category
#[utoipa::path(
    put,
    path = "/thresholds/{category}",
    params(("category" = String, Path, description = "Order-status category")),
    request_body = UpdateThresholdRequest,
    responses(
        (status = 200, description = "Threshold updated", body = ThresholdInfo),
        (status = 400, description = "Invalid category or tiers", body = ApiError),
        (status = 404, description = "Category not configured", body = ApiError)
    ),
    tag = "thresholds"
)]
pub async fn update_threshold(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(request): Json<UpdateThresholdRequest>,
) -> Result<Json<ThresholdInfo>, ApiError> {
    let category = parse_category(&category)?;
    let tiers = check_tiers(ThresholdTiers::new(
        request.tier_1_hours,
        request.tier_2_hours,
        request.tier_3_hours,
    ))?;

    let repo = ThresholdConfigRepository::new(&state.db);
    let updated = repo.update_tiers(category, tiers).await?;

    Ok(Json(updated.into()))
}
