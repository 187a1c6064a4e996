//! HTTP server mode: accepts invocation payloads over HTTP

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::{Error, Result};
use crate::invocation::{handle_invocation, InvocationResult, Services};

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Clients every invocation runs with
    pub services: Services,
}

/// App state shared across handlers
#[derive(Clone)]
struct AppState {
    services: Services,
}

/// Build the router
pub fn router(config: ServerConfig) -> Router {
    let state = AppState {
        services: config.services,
    };

    Router::new()
        .route("/health", get(health))
        .route("/invoke", post(invoke))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn serve(config: ServerConfig, port: u16) -> Result<()> {
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Run one invocation
///
/// The response status mirrors the result's `statusCode`; an aborted run
/// answers 500.
async fn invoke(State(state): State<Arc<AppState>>, Json(payload): Json<Value>) -> impl IntoResponse {
    let now = chrono::Utc::now().naive_utc();
    let result = match handle_invocation(&payload, &state.services, now).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Invocation failed");
            InvocationResult::internal_error(e.to_string())
        }
    };

    let status =
        StatusCode::from_u16(result.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(result))
}
