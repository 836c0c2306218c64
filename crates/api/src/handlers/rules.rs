//! Handlers for sensor rule authoring.
//!
//! All configuration-time strictness lives here: a rule is only persisted
//! after its clause array revalidates into a typed
//! [`RuleConfig`](fleetwatch_core::rule::RuleConfig), so malformed configs
//! are rejected with a per-field reason and never reach evaluation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use fleetwatch_core::error::CoreError;
use fleetwatch_core::rule::RuleConfig;
use fleetwatch_core::types::DbId;
use fleetwatch_db::models::sensor_rule::{SensorRule, UpsertSensorRule};
use fleetwatch_db::repositories::{SensorRepo, SensorRuleRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOperator;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for creating or updating a rule.
#[derive(Debug, Deserialize, Validate)]
pub struct RulePayload {
    pub device_sensor_id: DbId,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Raw clause array; validated via [`RuleConfig::from_parts`].
    pub conditions: serde_json::Value,
    /// Absent or unrecognized values fall back to `or`.
    #[serde(default)]
    pub logic: Option<String>,
    pub severity: String,
    #[validate(length(min = 1, max = 500))]
    pub message_template: String,
    #[serde(default = "default_window_minutes")]
    #[validate(range(min = 1, max = 1440))]
    pub evaluation_window_minutes: i32,
    #[serde(default = "default_consecutive")]
    #[validate(range(min = 1, max = 100))]
    pub consecutive_violations_required: i32,
    #[serde(default = "default_cooldown_minutes")]
    #[validate(range(min = 0, max = 1440))]
    pub cooldown_minutes: i32,
}

fn default_window_minutes() -> i32 {
    15
}

fn default_consecutive() -> i32 {
    1
}

fn default_cooldown_minutes() -> i32 {
    15
}

impl RulePayload {
    /// Structural validation plus clause-level revalidation.
    fn check(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        RuleConfig::from_parts(
            &self.conditions,
            self.logic.as_deref().unwrap_or("or"),
            &self.severity,
            &self.message_template,
        )?;
        Ok(())
    }

    fn as_upsert(&self) -> UpsertSensorRule<'_> {
        UpsertSensorRule {
            device_sensor_id: self.device_sensor_id,
            name: &self.name,
            conditions: &self.conditions,
            logic: self.logic.as_deref().unwrap_or("or"),
            severity: &self.severity,
            message_template: &self.message_template,
            evaluation_window_minutes: self.evaluation_window_minutes,
            consecutive_violations_required: self.consecutive_violations_required,
            cooldown_minutes: self.cooldown_minutes,
        }
    }
}

/// Query parameters for rule listing.
#[derive(Debug, Deserialize)]
pub struct RulesQuery {
    pub device_sensor_id: DbId,
    /// When true, include soft-disabled rules.
    #[serde(default)]
    pub include_disabled: bool,
}

/// GET /rules?device_sensor_id=N
pub async fn list_rules(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<RulesQuery>,
) -> AppResult<Json<DataResponse<Vec<SensorRule>>>> {
    let rules = if query.include_disabled {
        SensorRuleRepo::list_for_sensor(&state.pool, query.device_sensor_id).await?
    } else {
        SensorRuleRepo::list_active_for_sensor(&state.pool, query.device_sensor_id).await?
    };
    Ok(Json(DataResponse { data: rules }))
}

/// GET /rules/{id}
pub async fn get_rule(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(rule_id): Path<DbId>,
) -> AppResult<Json<DataResponse<SensorRule>>> {
    let rule = SensorRuleRepo::get(&state.pool, rule_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "sensor rule",
            id: rule_id,
        })?;
    Ok(Json(DataResponse { data: rule }))
}

/// POST /rules
pub async fn create_rule(
    State(state): State<AppState>,
    RequireOperator(_user): RequireOperator,
    Json(payload): Json<RulePayload>,
) -> AppResult<(StatusCode, Json<DataResponse<SensorRule>>)> {
    payload.check()?;

    let sensor = SensorRepo::get(&state.pool, payload.device_sensor_id).await?;
    if sensor.is_none() {
        return Err(CoreError::NotFound {
            entity: "device sensor",
            id: payload.device_sensor_id,
        }
        .into());
    }

    let rule = SensorRuleRepo::create(&state.pool, &payload.as_upsert()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// PUT /rules/{id}
pub async fn update_rule(
    State(state): State<AppState>,
    RequireOperator(_user): RequireOperator,
    Path(rule_id): Path<DbId>,
    Json(payload): Json<RulePayload>,
) -> AppResult<Json<DataResponse<SensorRule>>> {
    payload.check()?;

    let rule = SensorRuleRepo::update(&state.pool, rule_id, &payload.as_upsert())
        .await?
        .ok_or(CoreError::NotFound {
            entity: "sensor rule",
            id: rule_id,
        })?;

    // A reconfigured rule starts a fresh debounce episode.
    state.engine.forget_rule(rule_id).await;

    Ok(Json(DataResponse { data: rule }))
}

/// POST /rules/{id}/enable and POST /rules/{id}/disable
pub async fn set_rule_enabled(
    state: AppState,
    rule_id: DbId,
    is_enabled: bool,
) -> AppResult<Json<DataResponse<SensorRule>>> {
    let rule = SensorRuleRepo::set_enabled(&state.pool, rule_id, is_enabled)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "sensor rule",
            id: rule_id,
        })?;

    if !is_enabled {
        state.engine.forget_rule(rule_id).await;
    }

    Ok(Json(DataResponse { data: rule }))
}

/// POST /rules/{id}/enable
pub async fn enable_rule(
    State(state): State<AppState>,
    RequireOperator(_user): RequireOperator,
    Path(rule_id): Path<DbId>,
) -> AppResult<Json<DataResponse<SensorRule>>> {
    set_rule_enabled(state, rule_id, true).await
}

/// POST /rules/{id}/disable
pub async fn disable_rule(
    State(state): State<AppState>,
    RequireOperator(_user): RequireOperator,
    Path(rule_id): Path<DbId>,
) -> AppResult<Json<DataResponse<SensorRule>>> {
    set_rule_enabled(state, rule_id, false).await
}

/// Request body for dry-running a rule configuration.
#[derive(Debug, Deserialize)]
pub struct TestRulePayload {
    pub conditions: serde_json::Value,
    #[serde(default)]
    pub logic: Option<String>,
    /// The candidate reading.
    pub value: f64,
    /// Recent values, oldest first, as change/pattern conditions see them.
    #[serde(default)]
    pub history: Vec<f64>,
}

/// Dry-run result: the verdict plus exactly which clauses matched.
#[derive(Debug, serde::Serialize)]
pub struct TestRuleResult {
    pub triggered: bool,
    pub matched_conditions: serde_json::Value,
}

/// POST /rules/test
///
/// Evaluate a candidate configuration against a sample reading without
/// persisting anything. Inspection tooling for rule authors.
pub async fn test_rule(
    _user: AuthUser,
    Json(payload): Json<TestRulePayload>,
) -> AppResult<Json<DataResponse<TestRuleResult>>> {
    let config = RuleConfig::from_parts(
        &payload.conditions,
        payload.logic.as_deref().unwrap_or("or"),
        // Severity and message are irrelevant to a dry run.
        "info",
        "",
    )?;

    let verdict = fleetwatch_core::rule::evaluate_rule(&config, payload.value, &payload.history);
    let matched = serde_json::to_value(&verdict.matched)
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(Json(DataResponse {
        data: TestRuleResult {
            triggered: verdict.triggered,
            matched_conditions: matched,
        },
    }))
}
