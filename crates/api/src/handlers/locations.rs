//! Handlers for location endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use fleetwatch_db::models::location::Location;
use fleetwatch_db::repositories::LocationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for creating a location.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

/// GET /locations
pub async fn list_locations(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Location>>>> {
    let locations = LocationRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: locations }))
}

/// POST /locations
pub async fn create_location(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<CreateLocationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Location>>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let location = LocationRepo::create(&state.pool, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: location })))
}
