use std::sync::Arc;

use zonewatch_core::registry::ZoneRegistry;
use zonewatch_engine::InspectionController;
use zonewatch_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Zone registry: configuration plus live state per zone.
    pub registry: Arc<ZoneRegistry>,
    /// Inspection controller for manual checks and checklist actions.
    pub controller: Arc<InspectionController>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing zone events.
    pub event_bus: Arc<EventBus>,
}
