use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::rules;
use crate::state::AppState;

/// Mount `/rules` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rules", get(rules::list_rules).post(rules::create_rule))
        .route("/rules/test", post(rules::test_rule))
        .route("/rules/{id}", get(rules::get_rule))
        .route("/rules/{id}", put(rules::update_rule))
        .route("/rules/{id}/enable", post(rules::enable_rule))
        .route("/rules/{id}/disable", post(rules::disable_rule))
}
