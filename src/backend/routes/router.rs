/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Order
 *
 * 1. Health check
 * 2. Feed routes (reads and writes)
 * 3. Live update routes (SSE)
 * 4. Fallback handler (404)
 *
 * Every request passes through a `tower_http` trace layer.
 */

use axum::{http::StatusCode, routing::get, Json, Router};
use tower_http::trace::TraceLayer;

use crate::backend::routes::feed_routes::configure_feed_routes;
use crate::backend::routes::live_routes::configure_live_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
///
/// # Route Details
///
/// - `GET /health` - liveness probe, no principal required
/// - `GET /feed/posts`, `GET /feed/events` - merged feeds
/// - `POST /posts`, `POST /events` - create items
/// - `GET /live/posts`, `GET /live/events` - SSE streams
///
/// Unknown routes get a JSON 404.
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new().route("/health", get(health));

    let router = configure_feed_routes(router);
    let router = configure_live_routes(router);

    let router = router.fallback(not_found);

    router
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health() -> &'static str {
    "ok"
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Not Found",
            "status": StatusCode::NOT_FOUND.as_u16(),
        })),
    )
}
