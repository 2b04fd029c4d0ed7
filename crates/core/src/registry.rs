//! Zone registry: the single owner of all per-zone state.
//!
//! One [`ZoneEntry`] per configured zone, created when the zone's
//! configuration is loaded and dropped when it is removed. Entries are
//! shared via `Arc` so inspections for different zones proceed
//! independently; each entry's [`ZoneState`] sits behind its own mutex
//! and every read is a single consistent snapshot taken under it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::error::CoreError;
use crate::scheduler::is_due;
use crate::state::{FailReason, StateSnapshot, Verdict, ZoneState};
use crate::types::{Timestamp, ZoneId};
use crate::zone::{CheckMode, ZoneConfig, ZoneDefaults, ZonesFile};

// ---------------------------------------------------------------------------
// ZoneSnapshot
// ---------------------------------------------------------------------------

/// A zone's identity plus a consistent read of its state.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneSnapshot {
    pub id: ZoneId,
    pub name: String,
    #[serde(flatten)]
    pub state: StateSnapshot,
}

// ---------------------------------------------------------------------------
// ZoneEntry
// ---------------------------------------------------------------------------

/// One registered zone: static config plus guarded mutable state.
#[derive(Debug)]
pub struct ZoneEntry {
    config: ZoneConfig,
    state: Mutex<ZoneState>,
}

impl ZoneEntry {
    fn new(config: ZoneConfig, failure_threshold: u32) -> Self {
        Self {
            config,
            state: Mutex::new(ZoneState::new(failure_threshold)),
        }
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Claim the zone for one inspection. See [`ZoneState::begin_check`].
    pub async fn begin_check(&self) -> Result<(), CoreError> {
        self.state.lock().await.begin_check()
    }

    pub async fn complete_check(&self, verdict: Verdict, now: Timestamp) -> Result<(), CoreError> {
        self.state.lock().await.complete_check(verdict, now)
    }

    pub async fn fail_check(&self, reason: FailReason, now: Timestamp) -> Result<(), CoreError> {
        self.state.lock().await.fail_check(reason, now)
    }

    pub async fn clear_tasks(&self) -> Result<(), CoreError> {
        self.state.lock().await.clear_tasks()
    }

    pub async fn snooze(&self, duration: chrono::Duration, now: Timestamp) {
        self.state.lock().await.snooze(duration, now);
    }

    /// Atomic snapshot of config identity plus current state.
    pub async fn snapshot(&self, now: Timestamp) -> ZoneSnapshot {
        let state = self.state.lock().await.snapshot(now);
        ZoneSnapshot {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            state,
        }
    }

    /// Whether an automatic check is due for this zone. Manual-mode
    /// zones are never due; they are checked only on request.
    pub async fn is_due(&self, now: Timestamp) -> bool {
        if self.config.mode == CheckMode::Manual {
            return false;
        }
        is_due(&*self.state.lock().await, self.config.check_interval(), now)
    }
}

// ---------------------------------------------------------------------------
// ZoneRegistry
// ---------------------------------------------------------------------------

/// Owns every [`ZoneEntry`], in configuration order.
///
/// Created once at startup from the zones file; `add_zone`/`remove_zone`
/// exist for configuration reload. Shared via `Arc` between the engine
/// tick loop and the HTTP surface.
pub struct ZoneRegistry {
    zones: RwLock<Vec<Arc<ZoneEntry>>>,
    defaults: ZoneDefaults,
}

impl ZoneRegistry {
    /// Build a registry with the given shared defaults and no zones.
    pub fn new(defaults: ZoneDefaults) -> Self {
        Self {
            zones: RwLock::new(Vec::new()),
            defaults,
        }
    }

    /// Build a registry from a validated zones file.
    pub async fn from_config(file: &ZonesFile) -> Result<Self, CoreError> {
        let registry = Self::new(file.defaults.clone());
        for zone in &file.zones {
            registry.add_zone(zone.clone()).await?;
        }
        Ok(registry)
    }

    pub fn defaults(&self) -> &ZoneDefaults {
        &self.defaults
    }

    /// Register a zone, appending it to the configuration order.
    pub async fn add_zone(&self, config: ZoneConfig) -> Result<(), CoreError> {
        config.validate()?;
        let mut zones = self.zones.write().await;
        if zones.iter().any(|entry| entry.id() == config.id) {
            return Err(CoreError::Config(format!(
                "zone id '{}' is already registered",
                config.id
            )));
        }
        zones.push(Arc::new(ZoneEntry::new(
            config,
            self.defaults.failure_threshold,
        )));
        Ok(())
    }

    /// Drop a zone and its state.
    pub async fn remove_zone(&self, id: &str) -> Result<(), CoreError> {
        let mut zones = self.zones.write().await;
        let before = zones.len();
        zones.retain(|entry| entry.id() != id);
        if zones.len() == before {
            return Err(CoreError::ZoneNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Look up a zone entry by id.
    pub async fn entry(&self, id: &str) -> Result<Arc<ZoneEntry>, CoreError> {
        self.zones
            .read()
            .await
            .iter()
            .find(|entry| entry.id() == id)
            .cloned()
            .ok_or_else(|| CoreError::ZoneNotFound(id.to_string()))
    }

    /// All zone entries in configuration order.
    pub async fn entries(&self) -> Vec<Arc<ZoneEntry>> {
        self.zones.read().await.clone()
    }

    /// Snapshots of every zone, in configuration order.
    pub async fn snapshots(&self, now: Timestamp) -> Vec<ZoneSnapshot> {
        let entries = self.entries().await;
        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshots.push(entry.snapshot(now).await);
        }
        snapshots
    }

    /// Snapshot of a single zone.
    pub async fn snapshot(&self, id: &str, now: Timestamp) -> Result<ZoneSnapshot, CoreError> {
        Ok(self.entry(id).await?.snapshot(now).await)
    }

    /// Ids of every zone due for an automatic check, in configuration
    /// order. Emits ids only; the engine does the I/O.
    pub async fn due_zone_ids(&self, now: Timestamp) -> Vec<ZoneId> {
        let entries = self.entries().await;
        let mut due = Vec::new();
        for entry in entries {
            if entry.is_due(now).await {
                due.push(entry.id().to_string());
            }
        }
        due
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
