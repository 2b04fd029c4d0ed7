//! End-to-end inspection execution.
//!
//! [`InspectionController`] is the only code path that runs a check:
//! manual requests from the API and automatic ticks from the runner
//! both land here, so the snapshot-query-parse-record sequence and its
//! failure handling exist exactly once.
//!
//! An inspection holds the zone's `checking` claim from `begin_check`
//! until exactly one of `complete_check` / `fail_check`; every exit
//! path of the pipeline records an outcome and releases the claim.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use zonewatch_core::error::CoreError;
use zonewatch_core::prompt::build_prompt;
use zonewatch_core::registry::{ZoneEntry, ZoneRegistry};
use zonewatch_core::state::FailReason;
use zonewatch_core::types::ZoneId;
use zonewatch_core::{parser, zone};
use zonewatch_events::{kinds, EventBus, ZoneEvent};
use zonewatch_vision::{CameraSource, VisionClient};

/// Runs inspections and records their outcomes.
///
/// Shared as `Arc<InspectionController>` between the HTTP surface and
/// the tick runner. Vision clients are built once at startup, one per
/// zone, and looked up by zone id.
pub struct InspectionController {
    registry: Arc<ZoneRegistry>,
    camera: Arc<dyn CameraSource>,
    clients: HashMap<ZoneId, Arc<dyn VisionClient>>,
    bus: Arc<EventBus>,
    max_tasks: usize,
}

impl InspectionController {
    pub fn new(
        registry: Arc<ZoneRegistry>,
        camera: Arc<dyn CameraSource>,
        clients: HashMap<ZoneId, Arc<dyn VisionClient>>,
        bus: Arc<EventBus>,
    ) -> Self {
        let max_tasks = registry.defaults().max_tasks;
        Self {
            registry,
            camera,
            clients,
            bus,
            max_tasks,
        }
    }

    pub fn registry(&self) -> &Arc<ZoneRegistry> {
        &self.registry
    }

    /// Start an inspection for a zone.
    ///
    /// Claims the zone synchronously, so a second request while one is
    /// in flight fails here with [`CoreError::AlreadyChecking`]. The
    /// inspection itself runs on a spawned task; the zone leaves the
    /// `checking` status when that task records an outcome.
    pub async fn request_check(self: &Arc<Self>, zone_id: &str) -> Result<(), CoreError> {
        let entry = self.registry.entry(zone_id).await?;
        entry.begin_check().await?;

        let inspection_id = uuid::Uuid::new_v4();
        tracing::info!(zone_id, %inspection_id, "Inspection started");
        self.bus.publish(
            ZoneEvent::new(kinds::CHECK_STARTED, zone_id)
                .with_payload(serde_json::json!({"inspection_id": inspection_id})),
        );

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.perform(entry, inspection_id).await;
        });

        Ok(())
    }

    /// Clear a zone's checklist and force it tidy.
    pub async fn clear_tasks(&self, zone_id: &str) -> Result<(), CoreError> {
        let entry = self.registry.entry(zone_id).await?;
        entry.clear_tasks().await?;

        tracing::info!(zone_id, "Tasks cleared manually");
        self.bus
            .publish(ZoneEvent::new(kinds::TASKS_CLEARED, zone_id));
        Ok(())
    }

    /// Suppress automatic checks for a zone for `duration_minutes`.
    ///
    /// The range is validated at the API boundary; this re-checks it so
    /// no internal caller can sneak in an unbounded snooze.
    pub async fn snooze(&self, zone_id: &str, duration_minutes: u32) -> Result<(), CoreError> {
        if !(zone::MIN_SNOOZE_MINUTES..=zone::MAX_SNOOZE_MINUTES).contains(&duration_minutes) {
            return Err(CoreError::Validation(format!(
                "snooze duration must be {}..={} minutes, got {}",
                zone::MIN_SNOOZE_MINUTES,
                zone::MAX_SNOOZE_MINUTES,
                duration_minutes
            )));
        }

        let entry = self.registry.entry(zone_id).await?;
        let now = Utc::now();
        let duration = chrono::Duration::minutes(i64::from(duration_minutes));
        entry.snooze(duration, now).await;

        let until = now + duration;
        tracing::info!(zone_id, duration_minutes, snoozed_until = %until, "Zone snoozed");
        self.bus.publish(
            ZoneEvent::new(kinds::SNOOZED, zone_id).with_payload(serde_json::json!({
                "duration_minutes": duration_minutes,
                "snoozed_until": until,
            })),
        );
        Ok(())
    }

    // ---- inspection pipeline ----

    /// Run one claimed inspection to an outcome.
    async fn perform(&self, entry: Arc<ZoneEntry>, inspection_id: uuid::Uuid) {
        let config = entry.config();

        let Some(client) = self.clients.get(config.id.as_str()) else {
            // Clients are built from the same config as the registry;
            // a missing one is a wiring bug, not a provider outage.
            self.fail(
                &entry,
                inspection_id,
                FailReason::ProviderError,
                "no vision client configured for zone".to_string(),
            )
            .await;
            return;
        };

        let image = match self.camera.capture(&config.camera_ref).await {
            Ok(image) => image,
            Err(e) => {
                self.fail(&entry, inspection_id, e.fail_reason(), e.to_string())
                    .await;
                return;
            }
        };

        let prompt = build_prompt(config);
        let reply = match client.query(&image, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                self.fail(&entry, inspection_id, e.fail_reason(), e.to_string())
                    .await;
                return;
            }
        };

        let verdict = match parser::parse_verdict(&reply, self.max_tasks) {
            Ok(verdict) => verdict,
            Err(e) => {
                self.fail(
                    &entry,
                    inspection_id,
                    FailReason::MalformedResponse,
                    e.to_string(),
                )
                .await;
                return;
            }
        };

        let status = if verdict.is_tidy { "tidy" } else { "messy" };
        let task_count = verdict.tasks.len();
        let comment = verdict.comment.clone();

        if let Err(e) = entry.complete_check(verdict, Utc::now()).await {
            tracing::error!(
                zone_id = entry.id(),
                %inspection_id,
                error = %e,
                "Could not record inspection verdict"
            );
            return;
        }

        tracing::info!(
            zone_id = entry.id(),
            %inspection_id,
            status,
            task_count,
            "Inspection completed"
        );
        self.bus.publish(
            ZoneEvent::new(kinds::CHECK_COMPLETED, entry.id()).with_payload(serde_json::json!({
                "inspection_id": inspection_id,
                "status": status,
                "task_count": task_count,
                "comment": comment,
            })),
        );
    }

    /// Record a failed inspection and publish the failure event.
    async fn fail(
        &self,
        entry: &ZoneEntry,
        inspection_id: uuid::Uuid,
        reason: FailReason,
        detail: String,
    ) {
        tracing::warn!(
            zone_id = entry.id(),
            %inspection_id,
            reason = %reason,
            detail,
            "Inspection failed"
        );

        if let Err(e) = entry.fail_check(reason, Utc::now()).await {
            tracing::error!(
                zone_id = entry.id(),
                %inspection_id,
                error = %e,
                "Could not record inspection failure"
            );
            return;
        }

        self.bus.publish(
            ZoneEvent::new(kinds::CHECK_FAILED, entry.id()).with_payload(serde_json::json!({
                "inspection_id": inspection_id,
                "reason": reason.as_str(),
                "detail": detail,
            })),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use zonewatch_core::state::ZoneStatus;
    use zonewatch_core::zone::{CheckMode, Provider, ZoneConfig, ZoneDefaults};
    use zonewatch_vision::{CameraError, CapturedImage, VisionError};

    use super::*;

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    fn zone_config(id: &str) -> ZoneConfig {
        ZoneConfig {
            id: id.into(),
            name: format!("Zone {id}"),
            camera_ref: format!("http://cam.local/{id}.jpg"),
            personality: "a tidy assistant".into(),
            pickiness: 3,
            check_interval_minutes: 30,
            mode: CheckMode::Auto,
            provider: Provider::OpenAi,
            model: None,
            base_url: None,
            api_credential_ref: "OPENAI_API_KEY".into(),
        }
    }

    struct StubCamera {
        fail: bool,
    }

    #[async_trait]
    impl CameraSource for StubCamera {
        async fn capture(&self, _camera_ref: &str) -> Result<CapturedImage, CameraError> {
            if self.fail {
                return Err(CameraError::Unavailable("connection refused".into()));
            }
            Ok(CapturedImage {
                bytes: vec![0xFF, 0xD8, 0xFF],
                mime: "image/jpeg",
                dimensions: Some((640, 480)),
            })
        }
    }

    /// Replays a scripted sequence of replies, one per query.
    struct ScriptedVision {
        replies: Mutex<VecDeque<Result<String, VisionError>>>,
    }

    impl ScriptedVision {
        fn new(replies: Vec<Result<String, VisionError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
            })
        }
    }

    #[async_trait]
    impl VisionClient for ScriptedVision {
        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        async fn query(&self, _image: &CapturedImage, _prompt: &str) -> Result<String, VisionError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(VisionError::Provider {
                        provider: "scripted",
                        detail: "script exhausted".into(),
                    })
                })
        }
    }

    /// Blocks every query until `release` is notified.
    struct GatedVision {
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl VisionClient for GatedVision {
        fn provider_name(&self) -> &'static str {
            "gated"
        }

        async fn query(&self, _image: &CapturedImage, _prompt: &str) -> Result<String, VisionError> {
            self.release.notified().await;
            Ok(r#"{"status": "tidy", "tasks": []}"#.to_string())
        }
    }

    async fn controller_with(
        zone_id: &str,
        camera_fails: bool,
        vision: Arc<dyn VisionClient>,
    ) -> (Arc<InspectionController>, Arc<EventBus>) {
        let registry = Arc::new(ZoneRegistry::new(ZoneDefaults::default()));
        registry.add_zone(zone_config(zone_id)).await.unwrap();

        let mut clients: HashMap<ZoneId, Arc<dyn VisionClient>> = HashMap::new();
        clients.insert(zone_id.to_string(), vision);

        let bus = Arc::new(EventBus::default());
        let controller = Arc::new(InspectionController::new(
            registry,
            Arc::new(StubCamera { fail: camera_fails }),
            clients,
            Arc::clone(&bus),
        ));
        (controller, bus)
    }

    /// Receive events until one of the given type arrives.
    async fn wait_for(
        rx: &mut tokio::sync::broadcast::Receiver<ZoneEvent>,
        event_type: &str,
    ) -> ZoneEvent {
        tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                let event = rx.recv().await.expect("bus closed");
                if event.event_type == event_type {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn messy_verdict_is_recorded_with_tasks() {
        let vision = ScriptedVision::new(vec![Ok(
            r#"{"status": "messy", "tasks": ["Clear the desk", "Empty the bin"], "comment": "Desk mostly."}"#.into(),
        )]);
        let (controller, bus) = controller_with("office", false, vision).await;
        let mut rx = bus.subscribe();

        controller.request_check("office").await.unwrap();
        let completed = wait_for(&mut rx, kinds::CHECK_COMPLETED).await;
        assert_eq!(completed.payload["status"], "messy");
        assert_eq!(completed.payload["task_count"], 2);

        let snap = controller
            .registry()
            .snapshot("office", Utc::now())
            .await
            .unwrap();
        assert_eq!(snap.state.status, ZoneStatus::Messy);
        assert_eq!(snap.state.tasks, vec!["Clear the desk", "Empty the bin"]);
        assert_eq!(snap.state.comment.as_deref(), Some("Desk mostly."));
        assert_eq!(snap.state.consecutive_failures, 0);
        assert!(snap.state.last_success_at.is_some());
    }

    #[tokio::test]
    async fn tidy_verdict_clears_the_checklist() {
        let vision = ScriptedVision::new(vec![Ok(r#"{"status": "tidy", "tasks": []}"#.into())]);
        let (controller, bus) = controller_with("office", false, vision).await;
        let mut rx = bus.subscribe();

        controller.request_check("office").await.unwrap();
        wait_for(&mut rx, kinds::CHECK_COMPLETED).await;

        let snap = controller
            .registry()
            .snapshot("office", Utc::now())
            .await
            .unwrap();
        assert_eq!(snap.state.status, ZoneStatus::Tidy);
        assert!(snap.state.tasks.is_empty());
    }

    #[tokio::test]
    async fn malformed_reply_fails_without_changing_status() {
        let vision = ScriptedVision::new(vec![Ok("the room seems fine?".into())]);
        let (controller, bus) = controller_with("office", false, vision).await;
        let mut rx = bus.subscribe();

        controller.request_check("office").await.unwrap();
        let failed = wait_for(&mut rx, kinds::CHECK_FAILED).await;
        assert_eq!(failed.payload["reason"], "malformed_response");

        let snap = controller
            .registry()
            .snapshot("office", Utc::now())
            .await
            .unwrap();
        assert_eq!(snap.state.status, ZoneStatus::Unknown);
        assert_eq!(snap.state.consecutive_failures, 1);
        assert_eq!(snap.state.last_error.as_deref(), Some("malformed_response"));
        assert!(snap.state.last_checked_at.is_some());
        assert!(snap.state.last_success_at.is_none());
    }

    #[tokio::test]
    async fn repeated_camera_failures_reach_error_status() {
        let vision = ScriptedVision::new(vec![]);
        let (controller, bus) = controller_with("office", true, vision).await;
        let mut rx = bus.subscribe();

        // Default failure threshold is 3.
        for _ in 0..3 {
            controller.request_check("office").await.unwrap();
            let failed = wait_for(&mut rx, kinds::CHECK_FAILED).await;
            assert_eq!(failed.payload["reason"], "camera_unavailable");
        }

        let snap = controller
            .registry()
            .snapshot("office", Utc::now())
            .await
            .unwrap();
        assert_eq!(snap.state.status, ZoneStatus::Error);
        assert_eq!(snap.state.consecutive_failures, 3);
    }

    #[tokio::test]
    async fn second_request_while_in_flight_is_rejected() {
        let vision = Arc::new(GatedVision {
            release: tokio::sync::Notify::new(),
        });
        let (controller, bus) = controller_with("office", false, Arc::clone(&vision) as _).await;
        let mut rx = bus.subscribe();

        controller.request_check("office").await.unwrap();
        wait_for(&mut rx, kinds::CHECK_STARTED).await;

        assert_matches!(
            controller.request_check("office").await,
            Err(CoreError::AlreadyChecking)
        );

        // Let the first inspection finish so it records an outcome.
        vision.release.notify_one();
        wait_for(&mut rx, kinds::CHECK_COMPLETED).await;
    }

    #[tokio::test]
    async fn manual_check_works_while_snoozed() {
        let vision = ScriptedVision::new(vec![Ok(r#"{"status": "tidy", "tasks": []}"#.into())]);
        let (controller, bus) = controller_with("office", false, vision).await;
        let mut rx = bus.subscribe();

        controller.snooze("office", 120).await.unwrap();
        controller.request_check("office").await.unwrap();
        wait_for(&mut rx, kinds::CHECK_COMPLETED).await;

        let snap = controller
            .registry()
            .snapshot("office", Utc::now())
            .await
            .unwrap();
        assert_eq!(snap.state.status, ZoneStatus::Tidy);
        // The snooze itself stays in place for automatic scheduling.
        assert!(snap.state.snoozed_until.is_some());
    }

    #[tokio::test]
    async fn unknown_zone_is_reported_as_not_found() {
        let vision = ScriptedVision::new(vec![]);
        let (controller, _bus) = controller_with("office", false, vision).await;

        assert_matches!(
            controller.request_check("garage").await,
            Err(CoreError::ZoneNotFound(_))
        );
        assert_matches!(
            controller.clear_tasks("garage").await,
            Err(CoreError::ZoneNotFound(_))
        );
        assert_matches!(
            controller.snooze("garage", 30).await,
            Err(CoreError::ZoneNotFound(_))
        );
    }

    #[tokio::test]
    async fn out_of_range_snooze_is_rejected() {
        let vision = ScriptedVision::new(vec![]);
        let (controller, _bus) = controller_with("office", false, vision).await;

        assert_matches!(
            controller.snooze("office", 0).await,
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            controller.snooze("office", 1441).await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn clear_tasks_publishes_and_forces_tidy() {
        let vision = ScriptedVision::new(vec![Ok(
            r#"{"status": "messy", "tasks": ["Fold the blanket"]}"#.into(),
        )]);
        let (controller, bus) = controller_with("office", false, vision).await;
        let mut rx = bus.subscribe();

        controller.request_check("office").await.unwrap();
        wait_for(&mut rx, kinds::CHECK_COMPLETED).await;

        controller.clear_tasks("office").await.unwrap();
        wait_for(&mut rx, kinds::TASKS_CLEARED).await;

        let snap = controller
            .registry()
            .snapshot("office", Utc::now())
            .await
            .unwrap();
        assert_eq!(snap.state.status, ZoneStatus::Tidy);
        assert!(snap.state.tasks.is_empty());
        assert_eq!(snap.state.comment.as_deref(), Some("Tasks cleared manually."));
    }
}
