use std::sync::Arc;

use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use pomo_store::settings::SettingsRepo;
use pomo_store::tasks::TaskRepo;
use pomo_store::Database;

use crate::{settings, tasks};

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    /// The single browser origin allowed by CORS. Deployment-specific,
    /// so it lives here instead of being hard-coded at the router.
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<SettingsRepo>,
    pub tasks: Arc<TaskRepo>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            settings: Arc::new(SettingsRepo::new(db.clone())),
            tasks: Arc::new(TaskRepo::new(db)),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/api/settings/reset", post(settings::reset_settings))
        .route(
            "/api/settings/increment-session",
            post(settings::increment_session),
        )
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/today", get(tasks::today_tasks))
        .route("/api/tasks/today/duration", get(tasks::today_duration))
        .route("/api/tasks/search", get(tasks::search_tasks))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// CORS layer allowing exactly the configured origin. An unparsable
/// origin leaves CORS closed rather than falling open.
pub fn cors_layer(origin: &str) -> CorsLayer {
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!(origin, "invalid CORS origin, cross-origin requests disabled");
            CorsLayer::new()
        }
    }
}

/// Create and start the server. Returns a handle holding the bound port.
pub async fn start(config: ServerConfig, db: Database) -> Result<ServerHandle, std::io::Error> {
    let state = AppState::new(db);
    let router = build_router(state, cors_layer(&config.cors_origin));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "pomod server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
    })
}

/// Handle returned by `start()`. Holds the serve task alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

/// Liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}
