/**
 * Live Update Routes
 *
 * Server-Sent Events streams backed by the live update broker:
 *
 * - `GET /live/posts` - every `post_created` update
 * - `GET /live/events` - `event_created` updates addressed to the principal
 */

use axum::{routing::get, Router};

use crate::backend::realtime::subscription::{handle_event_stream, handle_post_stream};
use crate::backend::server::state::AppState;

/// Configure live update routes
pub fn configure_live_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/live/posts", get(handle_post_stream))
        .route("/live/events", get(handle_event_stream))
}
