//! Live update integration tests
//!
//! SSE streams fed by writes on the same process and on a second process
//! sharing the bus

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use classboard::backend::feed::MemoryFeedStore;
use classboard::backend::realtime::{MemoryBus, Transport, TransportError};
use classboard::shared::{event_created_channel, POST_CREATED_CHANNEL};
use futures_util::future::{self, BoxFuture, FutureExt};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::assert_contains;
use crate::common::{settle, TestApp};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

#[tokio::test]
async fn test_post_stream_receives_created_post() {
    let app = TestApp::new();
    let reader = Uuid::new_v4();
    let mut stream = app.open_stream("/live/posts", reader).await;

    let (status, _) = app
        .post_json("/posts", Some(Uuid::new_v4()), json!({"title": "Snow day", "content": "School closed"}))
        .await;
    assert_eq!(status.as_u16(), 201);

    let frame = stream.next_frame(WAIT).await.expect("post_created frame");
    assert_contains!(frame, "event: post_created");
    assert_contains!(frame, "Snow day");
}

#[tokio::test]
async fn test_stream_requires_principal() {
    let app = TestApp::new();
    let (status, _) = app.get("/live/posts", None).await;
    assert_eq!(status.as_u16(), 401);
}

#[tokio::test]
async fn test_post_reaches_stream_on_other_process() {
    let bus = MemoryBus::new();
    let writer = TestApp::on_bus(bus.clone(), Arc::new(Default::default()));
    let reader = TestApp::on_bus(bus.clone(), Arc::new(Default::default()));

    let mut stream = reader.open_stream("/live/posts", Uuid::new_v4()).await;

    writer
        .post_json("/posts", Some(Uuid::new_v4()), json!({"title": "Bake sale", "content": "Friday"}))
        .await;

    let frame = stream.next_frame(WAIT).await.expect("frame from other process");
    assert_contains!(frame, "Bake sale");
}

#[tokio::test]
async fn test_event_reaches_audience_only() {
    let app = TestApp::new();
    let member = Uuid::new_v4();
    let outsider = Uuid::new_v4();
    let class = app.store.add_class("Orchestra");
    app.store.add_member(class, member).unwrap();
    app.store.add_class("Chess");

    let mut member_stream = app.open_stream("/live/events", member).await;
    let mut outsider_stream = app.open_stream("/live/events", outsider).await;

    let start = Utc::now() + chrono::Duration::days(2);
    let (status, _) = app
        .post_json(
            "/events",
            Some(member),
            json!({
                "class_id": class,
                "title": "Concert",
                "start": start,
                "end": start + chrono::Duration::hours(2),
            }),
        )
        .await;
    assert_eq!(status.as_u16(), 201);

    let frame = member_stream.next_frame(WAIT).await.expect("event_created frame");
    assert_contains!(frame, "event: event_created");
    assert_contains!(frame, "Concert");

    assert_eq!(outsider_stream.next_frame(QUIET).await, None);
    assert_eq!(app.bus.subscribe_calls(&event_created_channel(outsider)), 1);
}

/// Transport whose publishes never complete in time
struct StalledTransport;

impl Transport for StalledTransport {
    fn subscribe<'a>(&'a self, _channel: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        future::ready(Ok(())).boxed()
    }

    fn unsubscribe<'a>(&'a self, _channel: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        future::ready(Ok(())).boxed()
    }

    fn publish<'a>(&'a self, _channel: &'a str, _payload: String) -> BoxFuture<'a, Result<(), TransportError>> {
        async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        future::ready(()).boxed()
    }
}

#[tokio::test]
async fn test_event_write_does_not_wait_for_fan_out() {
    let (_events, inbound) = mpsc::unbounded_channel();
    let app = TestApp::on_transport(Arc::new(StalledTransport), inbound, Arc::new(MemoryFeedStore::new()));
    let author = Uuid::new_v4();
    let class = app.store.add_class("Year 9");
    for _ in 0..20 {
        app.store.add_member(class, Uuid::new_v4()).unwrap();
    }
    app.store.add_member(class, author).unwrap();

    let start = Utc::now() + chrono::Duration::days(1);
    let write = app.post_json(
        "/events",
        Some(author),
        json!({"class_id": class, "title": "Exams", "start": start, "end": start}),
    );
    let (status, _) = tokio::time::timeout(Duration::from_secs(2), write)
        .await
        .expect("event write waited on the transport");
    assert_eq!(status.as_u16(), 201);
}

#[tokio::test]
async fn test_rejected_event_is_not_announced() {
    let app = TestApp::new();
    let member = Uuid::new_v4();
    let class = app.store.add_class("Robotics");
    app.store.add_member(class, member).unwrap();

    let mut member_stream = app.open_stream("/live/events", member).await;

    let start = Utc::now() + chrono::Duration::days(1);
    let (status, _) = app
        .post_json(
            "/events",
            Some(Uuid::new_v4()),
            json!({"class_id": class, "title": "Fake meeting", "start": start, "end": start}),
        )
        .await;
    assert_eq!(status.as_u16(), 403);

    assert_eq!(member_stream.next_frame(QUIET).await, None);
}

#[tokio::test]
async fn test_closing_stream_removes_listener() {
    let app = TestApp::new();

    let first = app.open_stream("/live/posts", Uuid::new_v4()).await;
    let second = app.open_stream("/live/posts", Uuid::new_v4()).await;
    assert_eq!(app.broker.listener_count(POST_CREATED_CHANNEL), 2);
    assert_eq!(app.bus.subscribe_calls(POST_CREATED_CHANNEL), 1);

    drop(first);
    assert_eq!(app.broker.listener_count(POST_CREATED_CHANNEL), 1);

    drop(second);
    assert_eq!(app.broker.listener_count(POST_CREATED_CHANNEL), 0);

    app.broker.flush().await;
    assert_eq!(app.bus.subscriber_count(POST_CREATED_CHANNEL), 0);
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let app = TestApp::new();
    let mut stream = app.open_stream("/live/posts", Uuid::new_v4()).await;

    app.broker.shutdown().await;
    settle().await;

    assert_eq!(stream.next_frame(WAIT).await, None);
    assert_eq!(app.bus.connection_count(), 0);

    let (status, _) = app.get("/live/posts", Some(Uuid::new_v4())).await;
    assert_eq!(status.as_u16(), 503);
}

#[tokio::test]
async fn test_write_succeeds_after_broker_shutdown() {
    let app = TestApp::new();
    app.broker.shutdown().await;

    let (status, _) = app
        .post_json("/posts", Some(Uuid::new_v4()), json!({"title": "Still works", "content": "yes"}))
        .await;
    assert_eq!(status.as_u16(), 201);
}
