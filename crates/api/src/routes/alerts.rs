use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Mount `/alerts` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/active", get(alerts::list_active_alerts))
        .route("/alerts/{id}/acknowledge", post(alerts::acknowledge_alert))
        .route("/alerts/{id}/resolve", post(alerts::resolve_alert))
        .route("/alerts/escalations/run", post(alerts::run_escalations))
}
