//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`ZoneEvent`]s. It is
//! shared via `Arc<EventBus>` between the inspection engine (publisher)
//! and any consumers such as log taps or future push surfaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use zonewatch_core::types::ZoneId;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Dot-separated event names published by the inspection engine.
pub mod kinds {
    pub const CHECK_STARTED: &str = "zone.check_started";
    pub const CHECK_COMPLETED: &str = "zone.check_completed";
    pub const CHECK_FAILED: &str = "zone.check_failed";
    pub const TASKS_CLEARED: &str = "zone.tasks_cleared";
    pub const SNOOZED: &str = "zone.snoozed";
}

// ---------------------------------------------------------------------------
// ZoneEvent
// ---------------------------------------------------------------------------

/// A domain event scoped to one zone.
///
/// Constructed via [`ZoneEvent::new`] and enriched with
/// [`with_payload`](ZoneEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneEvent {
    /// Dot-separated event name, e.g. `"zone.check_completed"`.
    pub event_type: String,

    /// Id of the zone the event is about.
    pub zone_id: ZoneId,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ZoneEvent {
    /// Create a new event with an empty payload.
    pub fn new(event_type: impl Into<String>, zone_id: impl Into<ZoneId>) -> Self {
        Self {
            event_type: event_type.into(),
            zone_id: zone_id.into(),
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`ZoneEvent`].
pub struct EventBus {
    sender: broadcast::Sender<ZoneEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// zone state never depends on event delivery.
    pub fn publish(&self, event: ZoneEvent) {
        // Ignore the SendError, it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ZoneEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
