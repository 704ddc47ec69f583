//! # Alerts API Handlers
//!
//! Read access to the alert ledger plus the operator mutations: resolve
//! (with an optional note) and acknowledge. Manual resolution is final;
//! the next automatic pass will not reopen the row unless the condition
//! re-triggers, in which case a fresh alert is created.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::state::{AlertStatus, Severity};
use crate::error::ApiError;
use crate::models::alert;
use crate::repositories::AlertRepository;
use crate::repositories::alert::AlertFilter;
use crate::server::AppState;

/// Query parameters for listing alerts
#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    /// Filter by alert type key (e.g. estoque_zero, pedido_parado_issue)
    pub alert_type: Option<String>,
    /// Filter by severity (yellow, red, critical)
    pub severity: Option<String>,
    /// Filter by entity reference (external order id or SKU)
    pub entity_ref: Option<String>,
    /// Filter by status (ativo, lido, resolvido); open alerts by default
    pub status: Option<String>,
    /// Maximum number of alerts to return (default: 50)
    pub limit: Option<u64>,
    /// Offset for pagination
    pub offset: Option<u64>,
}

/// Alert information response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AlertInfo {
    /// Unique identifier for the alert
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    /// Kind of entity the alert refers to
    #[schema(example = "order")]
    pub entity_kind: String,
    /// External order id or SKU
    #[schema(example = "2000001")]
    pub entity_ref: String,
    /// Alert taxonomy key
    #[schema(example = "pedido_parado_issue")]
    pub alert_type: String,
    /// Current severity tier
    #[schema(example = "red")]
    pub severity: String,
    /// Lifecycle status
    #[schema(example = "ativo")]
    pub status: String,
    /// Human-readable description
    pub message: Option<String>,
    /// Resolution timestamp, RFC 3339
    pub resolved_at: Option<String>,
    /// Resolution note
    pub resolution_note: Option<String>,
    /// Creation timestamp, RFC 3339
    pub created_at: String,
}

impl From<alert::Model> for AlertInfo {
    fn from(model: alert::Model) -> Self {
        Self {
            id: model.id.to_string(),
            entity_kind: model.entity_kind,
            entity_ref: model.entity_ref,
            alert_type: model.alert_type,
            severity: model.severity,
            status: model.status,
            message: model.message,
            resolved_at: model.resolved_at.map(|dt| dt.to_rfc3339()),
            resolution_note: model.resolution_note,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Response payload for the alerts listing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AlertsResponse {
    /// Alerts matching the query
    pub alerts: Vec<AlertInfo>,
}

/// Request body for resolving an alert
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveAlertRequest {
    /// Optional operator note recorded on the alert
    pub note: Option<String>,
}

/// List alerts, open ones by default
#[utoipa::path(
    get,
    path = "/alerts",
    params(
        ("alert_type" = Option<String>, Query, description = "Filter by alert type key"),
        ("severity" = Option<String>, Query, description = "Filter by severity"),
        ("entity_ref" = Option<String>, Query, description = "Filter by entity reference"),
        ("status" = Option<String>, Query, description = "Filter by status; open alerts by default"),
        ("limit" = Option<u64>, Query, description = "Page size, default 50"),
        ("offset" = Option<u64>, Query, description = "Page offset"),
    ),
    responses(
        (status = 200, description = "Alerts matching the query", body = AlertsResponse),
        (status = 400, description = "Invalid filter value", body = ApiError)
    ),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let severity = query
        .severity
        .as_deref()
        .map(Severity::parse)
        .transpose()
        .map_err(|err| {
            ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &err.to_string())
        })?;

    let status = query
        .status
        .as_deref()
        .map(AlertStatus::parse)
        .transpose()
        .map_err(|err| {
            ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &err.to_string())
        })?;

    let repo = AlertRepository::new(&state.db);
    let alerts = repo
        .list(AlertFilter {
            alert_type: query.alert_type,
            severity,
            entity_ref: query.entity_ref,
            status,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;

    Ok(Json(AlertsResponse {
        alerts: alerts.into_iter().map(AlertInfo::from).collect(),
    }))
}

/// Resolve an alert with an optional operator note
#[utoipa::path(
    post,
    path = "/alerts/{id}/resolve",
    params(("id" = String, Path, description = "Alert identifier")),
    request_body = ResolveAlertRequest,
    responses(
        (status = 200, description = "Alert resolved", body = AlertInfo),
        (status = 404, description = "Alert not found", body = ApiError),
        (status = 409, description = "Alert already resolved", body = ApiError)
    ),
    tag = "alerts"
)]
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveAlertRequest>,
) -> Result<Json<AlertInfo>, ApiError> {
    let repo = AlertRepository::new(&state.db);

    let alert = repo.find_by_id(id).await?.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Alert not found")
    })?;

    if alert.status == AlertStatus::Resolvido.as_str() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "CONFLICT",
            "Alert is already resolved",
        ));
    }

    let note = request
        .note
        .unwrap_or_else(|| "Resolvido manualmente pelo operador".to_string());
    let resolved = repo.resolve(alert, Some(note)).await?;

    Ok(Json(resolved.into()))
}

/// Acknowledge an alert without resolving it
#[utoipa::path(
    post,
    path = "/alerts/{id}/acknowledge",
    params(("id" = String, Path, description = "Alert identifier")),
    responses(
        (status = 200, description = "Alert acknowledged", body = AlertInfo),
        (status = 404, description = "Alert not found", body = ApiError),
        (status = 409, description = "Alert already resolved", body = ApiError)
    ),
    tag = "alerts"
)]
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlertInfo>, ApiError> {
    let repo = AlertRepository::new(&state.db);

    let alert = repo.find_by_id(id).await?.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Alert not found")
    })?;

    if alert.status == AlertStatus::Resolvido.as_str() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "CONFLICT",
            "Alert is already resolved",
        ));
    }

    let acknowledged = repo.acknowledge(alert).await?;

    Ok(Json(acknowledged.into()))
}
