//! Handlers for device management endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use fleetwatch_core::alert_events::EVENT_DEVICE_COMMAND;
use fleetwatch_core::device_keys::generate_device_key;
use fleetwatch_core::error::CoreError;
use fleetwatch_core::types::DbId;
use fleetwatch_db::models::device::{CreateDevice, Device};
use fleetwatch_db::models::sensor::DeviceSensor;
use fleetwatch_db::repositories::{DeviceRepo, LocationRepo, SensorRepo};
use fleetwatch_events::FleetEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireOperator};
use crate::response::DataResponse;
use crate::state::AppState;

/// One sensor channel declared at registration.
#[derive(Debug, Deserialize, Validate)]
pub struct SensorSpec {
    #[validate(length(min = 1, max = 60))]
    pub sensor_type: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub unit: Option<String>,
}

/// Request body for device registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDeviceRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub location_id: DbId,
    #[validate(nested)]
    pub sensors: Vec<SensorSpec>,
}

/// Registration response: the only place the plaintext ingest key appears.
#[derive(Debug, Serialize)]
pub struct RegisteredDevice {
    pub device: Device,
    pub sensors: Vec<DeviceSensor>,
    /// Per-device ingest key; shown once, only its hash is stored.
    pub api_key: String,
}

/// GET /devices
pub async fn list_devices(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Device>>>> {
    let devices = DeviceRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: devices }))
}

/// GET /devices/{id}/sensors
pub async fn list_device_sensors(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(device_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<DeviceSensor>>>> {
    if !DeviceRepo::exists(&state.pool, device_id).await? {
        return Err(CoreError::NotFound {
            entity: "device",
            id: device_id,
        }
        .into());
    }
    let sensors = SensorRepo::list_for_device(&state.pool, device_id).await?;
    Ok(Json(DataResponse { data: sensors }))
}

/// POST /devices -- register a device and its sensor channels.
pub async fn register_device(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<RegisterDeviceRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<RegisteredDevice>>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !LocationRepo::exists(&state.pool, payload.location_id).await? {
        return Err(CoreError::NotFound {
            entity: "location",
            id: payload.location_id,
        }
        .into());
    }

    let key = generate_device_key();
    let device = DeviceRepo::create(
        &state.pool,
        &CreateDevice {
            name: &payload.name,
            location_id: payload.location_id,
            api_key_hash: &key.hash,
        },
    )
    .await?;

    let mut sensors = Vec::with_capacity(payload.sensors.len());
    for spec in &payload.sensors {
        let sensor = SensorRepo::create(
            &state.pool,
            device.id,
            &spec.sensor_type,
            &spec.name,
            spec.unit.as_deref(),
        )
        .await?;
        sensors.push(sensor);
    }

    tracing::info!(device_id = device.id, name = %device.name, "Device registered");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: RegisteredDevice {
                device,
                sensors,
                api_key: key.plaintext,
            },
        }),
    ))
}

/// POST /devices/{id}/arm and POST /devices/{id}/disarm
///
/// Persists the armed flag and pushes a `device.command` event so the
/// device's own session (and anyone watching it) sees the config change.
async fn set_armed(
    state: AppState,
    actor: DbId,
    device_id: DbId,
    armed: bool,
) -> AppResult<Json<DataResponse<Device>>> {
    let device = DeviceRepo::set_armed(&state.pool, device_id, armed)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "device",
            id: device_id,
        })?;

    let command = if armed { "arm" } else { "disarm" };
    let event = FleetEvent::new(EVENT_DEVICE_COMMAND)
        .with_device(device.id)
        .with_location(device.location_id)
        .with_actor(actor)
        .with_payload(serde_json::json!({
            "command": command,
            "is_armed": device.is_armed,
        }));
    state.event_bus.publish(event);

    Ok(Json(DataResponse { data: device }))
}

/// POST /devices/{id}/arm
pub async fn arm_device(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Path(device_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Device>>> {
    set_armed(state, user.user_id, device_id, true).await
}

/// POST /devices/{id}/disarm
pub async fn disarm_device(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Path(device_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Device>>> {
    set_armed(state, user.user_id, device_id, false).await
}
