//! Handlers for device telemetry ingestion.
//!
//! Devices authenticate with their per-device API key (`X-API-Key`
//! header). A batch is processed reading-by-reading: one malformed sample
//! or one failed dispatch is recorded in the response and never aborts the
//! rest of the batch.

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use fleetwatch_core::alert_events::EVENT_DEVICE_STATUS;
use fleetwatch_core::device_keys::hash_device_key;
use fleetwatch_core::error::CoreError;
use fleetwatch_core::types::{DbId, Timestamp};
use fleetwatch_db::models::device::Device;
use fleetwatch_db::repositories::{DeviceRepo, ReadingRepo, SensorRepo};
use fleetwatch_events::FleetEvent;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum readings accepted in one batch.
const MAX_BATCH_SIZE: usize = 100;

/// Authenticated device extracted from the `X-API-Key` header.
pub struct IngestDevice(pub Device);

impl FromRequestParts<AppState> for IngestDevice {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing X-API-Key header".into()))
            })?;

        let device = DeviceRepo::find_by_api_key_hash(&state.pool, &hash_device_key(key))
            .await?
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Unknown API key".into())))?;

        Ok(IngestDevice(device))
    }
}

/// One sample in an ingest batch.
#[derive(Debug, Deserialize)]
pub struct ReadingSample {
    pub sensor_id: DbId,
    pub value: f64,
    /// Defaults to the server clock when the device omits it.
    pub recorded_at: Option<Timestamp>,
}

/// Request body for `POST /ingest/readings`.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub readings: Vec<ReadingSample>,
}

/// One rejected sample, by batch index.
#[derive(Debug, Serialize)]
pub struct RejectedReading {
    pub index: usize,
    pub reason: String,
}

/// Response body for `POST /ingest/readings`.
#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub accepted: usize,
    pub alerts_fired: usize,
    pub rejected: Vec<RejectedReading>,
}

/// POST /ingest/readings
pub async fn ingest_readings(
    State(state): State<AppState>,
    IngestDevice(device): IngestDevice,
    Json(payload): Json<IngestRequest>,
) -> AppResult<Json<DataResponse<IngestSummary>>> {
    if payload.readings.is_empty() {
        return Err(AppError::BadRequest("readings must not be empty".into()));
    }
    if payload.readings.len() > MAX_BATCH_SIZE {
        return Err(AppError::BadRequest(format!(
            "batch exceeds {MAX_BATCH_SIZE} readings"
        )));
    }

    let now = Utc::now();
    DeviceRepo::touch_last_seen(&state.pool, device.id, now).await?;

    let mut summary = IngestSummary {
        accepted: 0,
        alerts_fired: 0,
        rejected: Vec::new(),
    };

    for (index, sample) in payload.readings.iter().enumerate() {
        match ingest_one(&state, &device, sample, now).await {
            Ok(alerts_fired) => {
                summary.accepted += 1;
                summary.alerts_fired += alerts_fired;
            }
            Err(reason) => {
                tracing::warn!(
                    device_id = device.id,
                    sensor_id = sample.sensor_id,
                    index,
                    reason = %reason,
                    "Reading rejected"
                );
                summary.rejected.push(RejectedReading { index, reason });
            }
        }
    }

    Ok(Json(DataResponse { data: summary }))
}

/// Persist and evaluate one sample. Returns the number of alerts fired.
async fn ingest_one(
    state: &AppState,
    device: &Device,
    sample: &ReadingSample,
    now: Timestamp,
) -> Result<usize, String> {
    if !sample.value.is_finite() {
        return Err("value must be a finite number".into());
    }

    let sensor = SensorRepo::get(&state.pool, sample.sensor_id)
        .await
        .map_err(|e| format!("sensor lookup failed: {e}"))?
        .filter(|sensor| sensor.device_id == device.id)
        .ok_or_else(|| format!("no sensor {} on this device", sample.sensor_id))?;

    let recorded_at = sample.recorded_at.unwrap_or(now);

    ReadingRepo::insert(&state.pool, sensor.id, sample.value, recorded_at)
        .await
        .map_err(|e| format!("reading insert failed: {e}"))?;

    state
        .engine
        .on_reading(device, &sensor, sample.value, recorded_at)
        .await
        .map(|outcome| outcome.alerts_fired)
        .map_err(|e| format!("evaluation failed: {e}"))
}

/// POST /ingest/heartbeat
///
/// Marks the device online and tells its watchers.
pub async fn ingest_heartbeat(
    State(state): State<AppState>,
    IngestDevice(device): IngestDevice,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    let now = Utc::now();
    DeviceRepo::touch_last_seen(&state.pool, device.id, now).await?;

    let event = FleetEvent::new(EVENT_DEVICE_STATUS)
        .with_device(device.id)
        .with_location(device.location_id)
        .with_payload(serde_json::json!({
            "status": "online",
            "last_seen_at": now,
        }));
    state.event_bus.publish(event);

    Ok(Json(DataResponse {
        data: serde_json::json!({ "acknowledged": true }),
    }))
}
