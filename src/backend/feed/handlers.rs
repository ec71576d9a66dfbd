//! Feed HTTP Handlers
//!
//! Reads return the merged feed for the principal. Writes persist first and
//! then publish a live update; a publish failure is logged by the broker and
//! never fails the write.
//!
//! Class-scoped writes require the principal to be a member of the class.
//! School-wide writes are open to every principal.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use futures_util::future::join_all;
use uuid::Uuid;

use super::service::load_feed;
use super::store::{FeedError, FeedStore, NewEvent, NewPost};
use crate::backend::error::BackendError;
use crate::backend::middleware::Principal;
use crate::backend::realtime::LiveUpdateBroker;
use crate::backend::server::state::AppState;
use crate::shared::{
    event_created_channel, CreateEventRequest, CreatePostRequest, Event, FeedQuery, FeedResponse,
    ItemKind, LiveUpdate, Post, POST_CREATED_CHANNEL,
};

/// Get the merged posts feed (GET /feed/posts?limit=&upcoming=)
pub async fn get_posts_feed(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, BackendError> {
    feed(&state, principal, ItemKind::Post, query).await
}

/// Get the merged events feed (GET /feed/events?limit=&upcoming=)
pub async fn get_events_feed(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, BackendError> {
    feed(&state, principal, ItemKind::Event, query).await
}

async fn feed(
    state: &AppState,
    principal: Principal,
    kind: ItemKind,
    mut query: FeedQuery,
) -> Result<Json<FeedResponse>, BackendError> {
    if query.limit == Some(0) {
        return Err(BackendError::handler(
            StatusCode::BAD_REQUEST,
            "limit must be greater than zero",
        ));
    }
    if query.limit.is_none() {
        query.limit = state.config.feed_default_limit;
    }

    let items = load_feed(state.store.as_ref(), principal.user_id(), kind, query).await?;
    Ok(Json(items.into()))
}

/// Create a post (POST /posts)
///
/// Publishes `post_created` on the global post channel once stored.
pub async fn create_post(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), BackendError> {
    let new_post = NewPost::from_request(principal.user_id(), request)?;
    authorize_class_write(&state, principal, new_post.class_id).await?;
    let post = state.store.create_post(new_post).await?;

    tracing::info!("[Feed] {} created post {}", principal, post.id);

    state
        .broker
        .publish(POST_CREATED_CHANNEL, &LiveUpdate::post_created(post.clone()))
        .await;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Create an event (POST /events)
///
/// Publishes `event_created` on the personal channel of every audience
/// member once stored. The fan-out runs on its own task so the response
/// does not wait on the transport.
pub async fn create_event(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), BackendError> {
    let new_event = NewEvent::from_request(principal.user_id(), request)?;
    authorize_class_write(&state, principal, new_event.class_id).await?;
    let event = state.store.create_event(new_event).await?;

    tracing::info!("[Feed] {} created event {}", principal, event.id);

    tokio::spawn(announce_event(
        state.store.clone(),
        state.broker.clone(),
        event.clone(),
    ));

    Ok((StatusCode::CREATED, Json(event)))
}

async fn authorize_class_write(
    state: &AppState,
    principal: Principal,
    class_id: Option<Uuid>,
) -> Result<(), BackendError> {
    let Some(class_id) = class_id else {
        return Ok(());
    };

    if state.store.is_member(class_id, principal.user_id()).await? {
        Ok(())
    } else {
        tracing::warn!("[Feed] {} tried to write to class {} without membership", principal, class_id);
        Err(FeedError::Forbidden(format!("Not a member of class {}", class_id)).into())
    }
}

async fn announce_event(
    store: Arc<dyn FeedStore>,
    broker: LiveUpdateBroker<LiveUpdate>,
    event: Event,
) {
    let audience = match store.audience(event.class_id).await {
        Ok(audience) => audience,
        Err(e) => {
            tracing::warn!("[Feed] Could not resolve audience for event {}: {}", event.id, e);
            return;
        }
    };

    let event_id = event.id;
    let update = LiveUpdate::event_created(event);
    join_all(audience.iter().map(|user_id| {
        let channel = event_created_channel(*user_id);
        let broker = &broker;
        let update = &update;
        async move { broker.publish(&channel, update).await }
    }))
    .await;

    tracing::debug!("[Feed] Event {} announced to {} users", event_id, audience.len());
}
