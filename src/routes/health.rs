// src/routes/health.rs
//! Liveness endpoint for the dashboard backend.
//!
//! `/health` lets container orchestrators and the display firmware check that
//! the service is up without triggering any upstream calls. Like every file
//! in `routes/`, it exports a subrouter to the gateway (`mod.rs`), which
//! merges it into the top-level router so `main.rs` never sees individual
//! endpoints.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
///
/// Returns a static JSON object. Neither the calendar nor the weather
/// provider is contacted.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/health` route.
///
/// Generic over the application state so it merges with the gateway router
/// whatever the state type is.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
