/**
 * Feed Routes
 *
 * - `GET /feed/posts` - merged posts feed for the principal
 * - `GET /feed/events` - merged events feed for the principal
 * - `POST /posts` - create a post, announces `post_created`
 * - `POST /events` - create an event, announces `event_created`
 *
 * Every route requires the `x-user-id` header.
 */

use axum::{
    routing::{get, post},
    Router,
};

use crate::backend::feed::handlers::{create_event, create_post, get_events_feed, get_posts_feed};
use crate::backend::server::state::AppState;

/// Configure feed routes
pub fn configure_feed_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/feed/posts", get(get_posts_feed))
        .route("/feed/events", get(get_events_feed))
        .route("/posts", post(create_post))
        .route("/events", post(create_event))
}
