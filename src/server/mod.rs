pub mod routes;

use crate::state::AppState;
use axum::routing::{get, post};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/api/health", get(routes::get_health))
        .route("/api/counters", get(routes::get_counters))
        .route("/api/analyze", post(routes::post_analysis))
        .route("/api/analyze/batch", post(routes::post_batch))
        .route("/api/analyze/{ticker}", get(routes::get_analysis))
        .route("/api/screen", post(routes::post_screen))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
