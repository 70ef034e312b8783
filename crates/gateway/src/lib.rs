//! HTTP gateway for braincast.
//!
//! Exposes the SSE chat stream, synchronous tool invocation, tool
//! listing, and a health check. Built on axum.

pub mod api;

use axum::{Router, extract::DefaultBodyLimit, response::Json, routing::get};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use braincast_audit::TracingAuditSink;
use braincast_backend::OpenAiBackend;
use braincast_config::AppConfig;
use braincast_core::ModelBackend;
use braincast_tools::{InMemoryStore, Sanitizer, ToolExecutor, default_registry};

/// Shared application state: built once at startup, read-only afterward.
pub struct AppState {
    pub config: AppConfig,
    pub backend: Arc<dyn ModelBackend>,
    pub executor: Arc<ToolExecutor>,
}

pub type SharedState = Arc<AppState>;

/// Build the full router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Assemble state from configuration: registry, executor, and backend
/// are built exactly once and shared across requests.
pub fn build_state(config: AppConfig) -> Result<SharedState, Box<dyn std::error::Error>> {
    let store = Arc::new(InMemoryStore::new());
    let registry = Arc::new(default_registry(store));
    let executor = Arc::new(ToolExecutor::new(
        registry,
        Arc::new(TracingAuditSink),
        Sanitizer::new(config.sanitizer.clone()),
    ));
    let backend: Arc<dyn ModelBackend> = Arc::new(OpenAiBackend::from_config(&config.backend)?);

    Ok(Arc::new(AppState {
        config,
        backend,
        executor,
    }))
}

/// Start the gateway HTTP server.
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(config)?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, router).await?;
    Ok(())
}
