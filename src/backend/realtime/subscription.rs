/**
 * Live Update Subscription Handlers
 *
 * Server-Sent Events endpoints that attach a broker listener for the
 * lifetime of one client connection.
 *
 * # Endpoints
 *
 * - `GET /live/posts` - streams `post_created` events
 * - `GET /live/events` - streams `event_created` events addressed to the
 *   principal
 *
 * # Connection Management
 *
 * - The listener forwards each update into a per-connection queue that the
 *   SSE stream drains
 * - The stream owns a `SubscriptionGuard`; when the client disconnects Axum
 *   drops the stream and the listener is removed with it
 * - Connections are kept alive using the SSE keep-alive mechanism
 */

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;

use crate::backend::error::BackendError;
use crate::backend::middleware::Principal;
use crate::backend::realtime::broker::LiveUpdateBroker;
use crate::shared::{event_created_channel, LiveUpdate, POST_CREATED_CHANNEL};

/// Handle post stream subscription (GET /live/posts)
///
/// # Example Response
///
/// ```http
/// HTTP/1.1 200 OK
/// Content-Type: text/event-stream
///
/// event: post_created
/// data: {"type":"post_created","post":{...},"published_at":"..."}
/// ```
pub async fn handle_post_stream(
    State(broker): State<LiveUpdateBroker<LiveUpdate>>,
    principal: Principal,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, BackendError> {
    tracing::info!("[Realtime] {} opened the post stream", principal);
    live_stream(&broker, POST_CREATED_CHANNEL).await
}

/// Handle event stream subscription (GET /live/events)
///
/// Only events whose audience includes the principal arrive here.
pub async fn handle_event_stream(
    State(broker): State<LiveUpdateBroker<LiveUpdate>>,
    principal: Principal,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, BackendError> {
    tracing::info!("[Realtime] {} opened the event stream", principal);
    live_stream(&broker, &event_created_channel(principal.user_id())).await
}

async fn live_stream(
    broker: &LiveUpdateBroker<LiveUpdate>,
    channel: &str,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, BackendError> {
    let (tx, rx) = mpsc::unbounded_channel::<LiveUpdate>();

    let guard = broker
        .subscribe(channel, move |update: &LiveUpdate| {
            // Receiver gone means the stream is being torn down.
            let _ = tx.send(update.clone());
        })?
        .into_guard();

    // Make sure the transport subscription is in place before the client
    // starts relying on the stream.
    broker.flush().await;

    tracing::debug!("[Realtime] {} streaming {}", guard.id(), channel);

    let stream = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        loop {
            let update = rx.recv().await?;

            match Event::default().event(update.event_name()).json_data(&update) {
                Ok(event) => return Some((Ok(event), (rx, guard))),
                Err(e) => {
                    tracing::error!("[Realtime] Failed to serialize {}: {:?}", update.event_name(), e);
                    continue;
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
