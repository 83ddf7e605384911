use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tracing::{debug, info};

use crate::Aggregator;

// ---

pub fn router() -> Router<Aggregator> {
    // ---
    Router::new().route("/api/combined", get(handler))
}

/// Handle `GET /api/combined`.
///
/// Always answers 200; sources that failed come back as their empty default.
async fn handler(State(aggregator): State<Aggregator>) -> impl IntoResponse {
    // ---
    info!("GET /api/combined - Fetching sources");

    let response = aggregator.combined().await;

    debug!("GET /api/combined - Returning OK");
    (StatusCode::OK, Json(response))
}
