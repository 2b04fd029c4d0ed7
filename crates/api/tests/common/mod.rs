//! Shared harness for API integration tests.
//!
//! Builds the production router via `build_app_router` with an
//! in-memory camera and a scripted vision client, so tests exercise the
//! same middleware stack production uses without any network access.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use zonewatch_core::registry::ZoneRegistry;
use zonewatch_core::types::ZoneId;
use zonewatch_core::zone::ZonesFile;
use zonewatch_engine::InspectionController;
use zonewatch_events::{EventBus, ZoneEvent};
use zonewatch_vision::{CameraError, CameraSource, CapturedImage, VisionClient, VisionError};

use zonewatch_api::config::ServerConfig;
use zonewatch_api::router::build_app_router;
use zonewatch_api::state::AppState;

/// How long to wait for an expected bus event before failing the test.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Two-zone configuration used by most tests.
pub const ZONES_JSON: &str = r#"{
    "zones": [
        {
            "id": "kitchen",
            "name": "Kitchen",
            "camera_ref": "http://cam.local/kitchen.jpg",
            "provider": "openai",
            "api_credential_ref": "OPENAI_API_KEY",
            "check_interval_minutes": 30
        },
        {
            "id": "bedroom",
            "name": "Bedroom",
            "camera_ref": "http://cam.local/bedroom.jpg",
            "provider": "gemini",
            "api_credential_ref": "GEMINI_API_KEY",
            "pickiness": 5
        }
    ]
}"#;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Camera that always returns the same tiny frame.
pub struct StubCamera;

#[async_trait]
impl CameraSource for StubCamera {
    async fn capture(&self, _camera_ref: &str) -> Result<CapturedImage, CameraError> {
        Ok(CapturedImage {
            bytes: vec![0xFF, 0xD8, 0xFF],
            mime: "image/jpeg",
            dimensions: Some((640, 480)),
        })
    }
}

/// Replays a scripted sequence of replies, one per query.
pub struct ScriptedVision {
    replies: Mutex<VecDeque<Result<String, VisionError>>>,
}

impl ScriptedVision {
    pub fn new(replies: Vec<Result<String, VisionError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
        })
    }

    /// Vision client that always reports the zone tidy.
    pub fn always_tidy() -> Arc<Self> {
        let replies = std::iter::repeat_with(|| Ok(r#"{"status": "tidy", "tasks": []}"#.to_string()))
            .take(16)
            .collect();
        Self::new(replies)
    }
}

#[async_trait]
impl VisionClient for ScriptedVision {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn query(&self, _image: &CapturedImage, _prompt: &str) -> Result<String, VisionError> {
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(VisionError::Provider {
                provider: "scripted",
                detail: "script exhausted".into(),
            })
        })
    }
}

/// Blocks every query until a `release` permit is granted, then reports
/// tidy. Permits accumulate, so tests may release inspections before
/// they have been polled up to the query.
pub struct GatedVision {
    pub release: tokio::sync::Semaphore,
}

impl GatedVision {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            release: tokio::sync::Semaphore::new(0),
        })
    }
}

#[async_trait]
impl VisionClient for GatedVision {
    fn provider_name(&self) -> &'static str {
        "gated"
    }

    async fn query(&self, _image: &CapturedImage, _prompt: &str) -> Result<String, VisionError> {
        self.release
            .acquire()
            .await
            .expect("gate semaphore closed")
            .forget();
        Ok(r#"{"status": "tidy", "tasks": []}"#.to_string())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// A built test application plus handles for assertions.
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<ZoneRegistry>,
    pub bus: Arc<EventBus>,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        zones_file: "zones.json".to_string(),
        tick_interval_secs: 60,
    }
}

/// Build the app with the standard two-zone config, wiring every zone
/// to the given vision client.
pub async fn build_test_app(vision: Arc<dyn VisionClient>) -> TestApp {
    let file = ZonesFile::from_json(ZONES_JSON).expect("test zones config must parse");
    let registry = Arc::new(
        ZoneRegistry::from_config(&file)
            .await
            .expect("test registry must build"),
    );

    let mut clients: HashMap<ZoneId, Arc<dyn VisionClient>> = HashMap::new();
    for zone in &file.zones {
        clients.insert(zone.id.clone(), Arc::clone(&vision));
    }

    let bus = Arc::new(EventBus::default());
    let controller = Arc::new(InspectionController::new(
        Arc::clone(&registry),
        Arc::new(StubCamera),
        clients,
        Arc::clone(&bus),
    ));

    let config = test_config();
    let state = AppState {
        registry: Arc::clone(&registry),
        controller,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&bus),
    };

    TestApp {
        router: build_app_router(state, &config),
        registry,
        bus,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a GET request to the app.
pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request must build");
    app.router.clone().oneshot(request).await.expect("request must run")
}

/// Send a POST request with an empty body.
pub async fn post(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request must build");
    app.router.clone().oneshot(request).await.expect("request must run")
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request must build");
    app.router.clone().oneshot(request).await.expect("request must run")
}

/// Collect and parse a JSON response body.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body must collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body must be valid JSON")
}

/// Assert a response status and return the parsed body.
pub async fn assert_status(response: Response<Body>, expected: StatusCode) -> serde_json::Value {
    let status = response.status();
    let json = body_json(response).await;
    assert_eq!(status, expected, "unexpected status, body: {json}");
    json
}

/// Receive events until one of the given type arrives.
pub async fn wait_for(
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
