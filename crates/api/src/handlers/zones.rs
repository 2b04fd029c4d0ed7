//! Handlers for the `/zones` resource.
//!
//! Read endpoints return registry snapshots; action endpoints go
//! through the [`InspectionController`] so every state change publishes
//! its event.
//!
//! [`InspectionController`]: zonewatch_engine::InspectionController

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use zonewatch_core::registry::ZoneSnapshot;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /zones
// ---------------------------------------------------------------------------

/// List all zones with their current state, in configuration order.
pub async fn list_zones(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ZoneSnapshot>>>> {
    let zones = state.registry.snapshots(Utc::now()).await;
    Ok(Json(DataResponse { data: zones }))
}

// ---------------------------------------------------------------------------
// GET /zones/{id}
// ---------------------------------------------------------------------------

/// Retrieve a single zone's state.
pub async fn get_zone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<ZoneSnapshot>>> {
    let zone = state.registry.snapshot(&id, Utc::now()).await?;
    Ok(Json(DataResponse { data: zone }))
}

// ---------------------------------------------------------------------------
// POST /zones/{id}/check
// ---------------------------------------------------------------------------

/// Request an immediate inspection.
///
/// Returns 202 Accepted with the zone already in `checking` status; the
/// inspection outcome lands asynchronously. A second request while one
/// is in flight gets 409 `ALREADY_CHECKING`.
pub async fn request_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.controller.request_check(&id).await?;

    let zone = state.registry.snapshot(&id, Utc::now()).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: zone })))
}

// ---------------------------------------------------------------------------
// POST /zones/{id}/clear-tasks
// ---------------------------------------------------------------------------

/// Clear the zone's checklist and force it tidy.
///
/// Returns 409 `BUSY` while an inspection is in flight.
pub async fn clear_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<ZoneSnapshot>>> {
    state.controller.clear_tasks(&id).await?;

    let zone = state.registry.snapshot(&id, Utc::now()).await?;
    Ok(Json(DataResponse { data: zone }))
}

// ---------------------------------------------------------------------------
// POST /zones/{id}/snooze
// ---------------------------------------------------------------------------

/// Request body for `POST /zones/{id}/snooze`.
#[derive(Debug, Deserialize)]
pub struct SnoozeRequest {
    /// How long to suppress automatic checks, in minutes (1..=1440).
    pub duration_minutes: u32,
}

/// Suppress automatic checks for a while. Manual checks still work.
pub async fn snooze(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<SnoozeRequest>,
) -> AppResult<Json<DataResponse<ZoneSnapshot>>> {
    state.controller.snooze(&id, input.duration_minutes).await?;

    let zone = state.registry.snapshot(&id, Utc::now()).await?;
    Ok(Json(DataResponse { data: zone }))
}
