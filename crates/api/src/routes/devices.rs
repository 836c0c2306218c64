use axum::routing::{get, post};
use axum::Router;

use crate::handlers::devices;
use crate::state::AppState;

/// Mount `/devices` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/devices",
            get(devices::list_devices).post(devices::register_device),
        )
        .route("/devices/{id}/sensors", get(devices::list_device_sensors))
        .route("/devices/{id}/arm", post(devices::arm_device))
        .route("/devices/{id}/disarm", post(devices::disarm_device))
}
