//! Handlers for alert endpoints.
//!
//! Acknowledge/resolve mirror the WebSocket actions and go through the same
//! conditional-update guard: a transition from an unexpected prior status
//! is a 409 with an explanation, never a silent overwrite.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use fleetwatch_core::alert_events::{EVENT_ALERT_ACKNOWLEDGED, EVENT_ALERT_RESOLVED};
use fleetwatch_core::error::CoreError;
use fleetwatch_core::types::DbId;
use fleetwatch_db::models::alert::Alert;
use fleetwatch_db::repositories::AlertRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireOperator};
use crate::realtime::publish_alert_event;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for alert listing.
#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    /// Maximum rows to return (default: 50, capped at 500).
    pub limit: Option<i64>,
    /// Restrict to one device.
    pub device_id: Option<DbId>,
}

/// GET /alerts -- recent alerts, newest first.
pub async fn list_alerts(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let alerts = match query.device_id {
        Some(device_id) => AlertRepo::list_for_device(&state.pool, device_id, limit).await?,
        None => AlertRepo::list_recent(&state.pool, limit).await?,
    };
    Ok(Json(DataResponse { data: alerts }))
}

/// GET /alerts/active -- all alerts awaiting acknowledgement, oldest first.
pub async fn list_active_alerts(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    let alerts = AlertRepo::list_active(&state.pool).await?;
    Ok(Json(DataResponse { data: alerts }))
}

/// POST /alerts/{id}/acknowledge
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Path(alert_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let Some(alert) = AlertRepo::acknowledge(&state.pool, alert_id, user.user_id).await? else {
        return Err(CoreError::Conflict(format!(
            "Alert {alert_id} was not acknowledged: it is not active"
        ))
        .into());
    };

    publish_alert_event(&state, EVENT_ALERT_ACKNOWLEDGED, &alert, Some(user.user_id)).await;
    Ok(Json(DataResponse { data: alert }))
}

/// POST /alerts/{id}/resolve
pub async fn resolve_alert(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Path(alert_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let Some(alert) = AlertRepo::resolve(&state.pool, alert_id, user.user_id).await? else {
        return Err(CoreError::Conflict(format!(
            "Alert {alert_id} was not resolved: it is already resolved or missing"
        ))
        .into());
    };

    publish_alert_event(&state, EVENT_ALERT_RESOLVED, &alert, Some(user.user_id)).await;
    Ok(Json(DataResponse { data: alert }))
}

/// POST /alerts/escalations/run
///
/// External-scheduler hook: runs one escalation sweep immediately.
/// A sweep already in flight makes this a no-op reporting zero processed.
pub async fn run_escalations(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    let processed = state.scanner.process_escalations().await?;
    Ok(Json(DataResponse {
        data: serde_json::json!({ "processed": processed }),
    }))
}
