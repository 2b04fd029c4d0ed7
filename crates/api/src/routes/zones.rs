//! Route definitions for the `/zones` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::zones;
use crate::state::AppState;

/// Routes mounted at `/zones`.
///
/// ```text
/// GET    /                  -> list_zones
/// GET    /{id}              -> get_zone
/// POST   /{id}/check        -> request_check
/// POST   /{id}/clear-tasks  -> clear_tasks
/// POST   /{id}/snooze       -> snooze
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(zones::list_zones))
        .route("/{id}", get(zones::get_zone))
        .route("/{id}/check", post(zones::request_check))
        .route("/{id}/clear-tasks", post(zones::clear_tasks))
        .route("/{id}/snooze", post(zones::snooze))
}
