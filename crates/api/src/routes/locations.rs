use axum::routing::get;
use axum::Router;

use crate::handlers::locations;
use crate::state::AppState;

/// Mount `/locations` routes.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/locations",
        get(locations::list_locations).post(locations::create_location),
    )
}
