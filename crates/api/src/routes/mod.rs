//! Route mounting.

pub mod alerts;
pub mod devices;
pub mod health;
pub mod ingest;
pub mod locations;
pub mod rules;

use axum::routing::any;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                              WebSocket (token query param)
///
/// /ingest/readings                 telemetry batch (device API key)
/// /ingest/heartbeat                device heartbeat (device API key)
///
/// /alerts                          list recent
/// /alerts/active                   list awaiting acknowledgement
/// /alerts/{id}/acknowledge         acknowledge (operator)
/// /alerts/{id}/resolve             resolve (operator)
/// /alerts/escalations/run          trigger an escalation sweep (admin)
///
/// /rules                           list, create (operator)
/// /rules/test                      dry-run a configuration
/// /rules/{id}                      get, update (operator)
/// /rules/{id}/enable               re-enable (operator)
/// /rules/{id}/disable              soft-disable (operator)
///
/// /devices                         list; register (admin)
/// /devices/{id}/sensors            list sensor channels
/// /devices/{id}/arm                arm (operator)
/// /devices/{id}/disarm             disarm (operator)
///
/// /locations                       list; create (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", any(ws::ws_handler))
        .merge(ingest::router())
        .merge(alerts::router())
        .merge(rules::router())
        .merge(devices::router())
        .merge(locations::router())
}
