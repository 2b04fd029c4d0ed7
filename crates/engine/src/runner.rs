//! Periodic scheduling loop.
//!
//! A single long-lived Tokio task that wakes on a fixed tick, asks the
//! registry which zones are due, and hands each one to the controller.
//! The tick only selects work; per-zone mutual exclusion lives entirely
//! in `begin_check`, so an overlapping tick can never double-start a
//! zone.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use zonewatch_core::error::CoreError;

use crate::controller::InspectionController;

/// Default wake-up interval for the scheduling loop.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic inspection scheduler.
pub struct InspectionRunner {
    controller: Arc<InspectionController>,
    tick_interval: Duration,
}

impl InspectionRunner {
    /// Create a runner with the default 60-second tick.
    pub fn new(controller: Arc<InspectionController>) -> Self {
        Self {
            controller,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Create a runner with a custom tick interval.
    pub fn with_tick_interval(controller: Arc<InspectionController>, tick: Duration) -> Self {
        Self {
            controller,
            tick_interval: tick,
        }
    }

    /// Run the scheduling loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        tracing::info!(
            tick_interval_ms = self.tick_interval.as_millis() as u64,
            "Inspection runner started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Inspection runner shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One scheduling cycle: start an inspection for every due zone.
    async fn tick(&self) {
        let due = self
            .controller
            .registry()
            .due_zone_ids(Utc::now())
            .await;

        for zone_id in due {
            match self.controller.request_check(&zone_id).await {
                Ok(()) => {}
                // Lost the race against a manual check; the zone is
                // already being looked at, which is what we wanted.
                Err(CoreError::AlreadyChecking) => {
                    tracing::debug!(zone_id, "Zone already checking, skipping tick");
                }
                Err(e) => {
                    tracing::error!(zone_id, error = %e, "Could not start scheduled inspection");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
