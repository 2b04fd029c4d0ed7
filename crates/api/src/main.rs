use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zonewatch_core::registry::ZoneRegistry;
use zonewatch_core::types::ZoneId;
use zonewatch_core::zone::ZonesFile;
use zonewatch_engine::{InspectionController, InspectionRunner};
use zonewatch_events::EventBus;
use zonewatch_vision::{build_client, CameraSource, HttpCameraSource, VisionClient};

use zonewatch_api::config::ServerConfig;
use zonewatch_api::router::build_app_router;
use zonewatch_api::state::AppState;

/// HTTP timeout for a single vision provider call.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zonewatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let zones_file =
        ZonesFile::load(Path::new(&config.zones_file)).expect("Failed to load zones file");
    tracing::info!(
        zones_file = %config.zones_file,
        zone_count = zones_file.zones.len(),
        "Loaded zone configuration"
    );

    // --- Registry ---
    let registry = Arc::new(
        ZoneRegistry::from_config(&zones_file)
            .await
            .expect("Failed to build zone registry"),
    );

    // --- Camera + vision clients ---
    let camera: Arc<dyn CameraSource> =
        Arc::new(HttpCameraSource::new().expect("Failed to build camera HTTP client"));

    let provider_http = reqwest::Client::builder()
        .timeout(PROVIDER_TIMEOUT)
        .build()
        .expect("Failed to build provider HTTP client");

    let mut clients: HashMap<ZoneId, Arc<dyn VisionClient>> = HashMap::new();
    for zone in &zones_file.zones {
        let client = build_client(zone, provider_http.clone())
            .unwrap_or_else(|e| panic!("Failed to build vision client for zone '{}': {e}", zone.id));
        tracing::info!(zone_id = %zone.id, provider = client.provider_name(), "Vision client ready");
        clients.insert(zone.id.clone(), client);
    }

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    // --- Inspection engine ---
    let controller = Arc::new(InspectionController::new(
        Arc::clone(&registry),
        camera,
        clients,
        Arc::clone(&event_bus),
    ));

    let runner_cancel = tokio_util::sync::CancellationToken::new();
    let runner = InspectionRunner::with_tick_interval(Arc::clone(&controller), config.tick_interval());
    let runner_cancel_clone = runner_cancel.clone();
    let runner_handle = tokio::spawn(async move {
        runner.run(runner_cancel_clone).await;
    });

    // --- App state + router ---
    let state = AppState {
        registry,
        controller,
        config: Arc::new(config.clone()),
        event_bus,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    runner_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), runner_handle).await;
    tracing::info!("Inspection runner stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
