use axum::routing::post;
use axum::Router;

use crate::handlers::ingest;
use crate::state::AppState;

/// Mount `/ingest` routes (device API key authentication).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingest/readings", post(ingest::ingest_readings))
        .route("/ingest/heartbeat", post(ingest::ingest_heartbeat))
}
