use axum::Router;

use crate::Aggregator;

mod combined;
mod health;

// ---

pub fn router(aggregator: Aggregator) -> Router {
    // ---
    Router::new()
        .merge(combined::router())
        .merge(health::router())
        .with_state(aggregator)
}
