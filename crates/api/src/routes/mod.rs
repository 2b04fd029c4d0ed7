//! Route definitions, grouped per resource.

pub mod health;
pub mod zones;

use axum::Router;

use crate::state::AppState;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/zones", zones::router())
}
