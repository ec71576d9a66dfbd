//! Feed API integration tests
//!
//! Tests for the merged feed endpoints and item creation

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use classboard::backend::feed::MemoryFeedStore;
use classboard::backend::realtime::MemoryBus;
use classboard::backend::server::ServerConfig;
use classboard::shared::{Event, FeedResponse, Post, SourceScope, Timed, TimedItem};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use crate::common::TestApp;
use crate::{assert_newest_first, assert_ok};

fn post(class_id: Option<Uuid>, created_at: DateTime<Utc>, title: &str) -> Post {
    Post {
        id: Uuid::new_v4(),
        scope: if class_id.is_some() { SourceScope::Class } else { SourceScope::School },
        class_id,
        author_id: Uuid::new_v4(),
        title: title.to_string(),
        content: "body".to_string(),
        created_at,
    }
}

fn titles(response: &FeedResponse) -> Vec<String> {
    response
        .items
        .iter()
        .map(|item| match item {
            TimedItem::Post(post) => post.title.clone(),
            TimedItem::Event(event) => event.title.clone(),
        })
        .collect()
}

/// Student in one class, with two school posts and two class posts
fn seeded_app() -> (TestApp, Uuid, Uuid) {
    let app = TestApp::new();
    let student = Uuid::new_v4();
    let class = app.store.add_class("4A");
    assert_ok!(app.store.add_member(class, student));

    let now = Utc::now();
    app.store.insert_post(post(None, now - Duration::hours(9), "school-9"));
    app.store.insert_post(post(None, now - Duration::hours(5), "school-5"));
    app.store.insert_post(post(Some(class), now - Duration::hours(8), "class-8"));
    app.store.insert_post(post(Some(class), now - Duration::hours(1), "class-1"));

    (app, student, class)
}

#[tokio::test]
async fn test_health_needs_no_principal() {
    let app = TestApp::new();
    let (status, _) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_principal_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.get("/feed/posts", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _) = app
        .post_json("/posts", None, json!({"title": "Hi", "content": "All"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_merged_posts_feed() {
    let (app, student, _) = seeded_app();

    let (status, body) = app.get("/feed/posts", Some(student)).await;
    assert_eq!(status, StatusCode::OK);

    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert_eq!(titles(&feed), vec!["class-1", "school-5", "class-8", "school-9"]);
    assert_eq!(feed.count, 4);
    assert_newest_first!(feed.items);
}

#[tokio::test]
async fn test_limit_applies_per_source() {
    let (app, student, _) = seeded_app();

    let (status, body) = app.get("/feed/posts?limit=1", Some(student)).await;
    assert_eq!(status, StatusCode::OK);

    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert_eq!(titles(&feed), vec!["class-1", "school-5"]);
}

#[tokio::test]
async fn test_zero_limit_is_rejected() {
    let (app, student, _) = seeded_app();
    let (status, _) = app.get("/feed/posts?limit=0", Some(student)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_default_limit_from_config() {
    let store = Arc::new(MemoryFeedStore::new());
    let config = ServerConfig::builder().feed_default_limit(1).build();
    let app = TestApp::with_config(MemoryBus::new(), store, config);

    let now = Utc::now();
    for hours in 1..=3 {
        app.store.insert_post(post(None, now - Duration::hours(hours), "school"));
    }

    let (_, body) = app.get("/feed/posts", Some(Uuid::new_v4())).await;
    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert_eq!(feed.count, 1);

    let (_, body) = app.get("/feed/posts?limit=3", Some(Uuid::new_v4())).await;
    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert_eq!(feed.count, 3);
}

#[tokio::test]
async fn test_upcoming_events_feed() {
    let app = TestApp::new();
    let now = Utc::now();

    let event = |title: &str, start: DateTime<Utc>, end: DateTime<Utc>| Event {
        id: Uuid::new_v4(),
        scope: SourceScope::School,
        class_id: None,
        author_id: Uuid::new_v4(),
        title: title.to_string(),
        description: String::new(),
        location: None,
        start,
        end,
    };
    app.store.insert_event(event("long-over", now - Duration::days(3), now - Duration::days(2)));
    app.store.insert_event(event("still-running", now - Duration::days(2), now + Duration::hours(1)));
    app.store.insert_event(event("tomorrow", now + Duration::days(1), now + Duration::days(1)));

    let (status, body) = app.get("/feed/events?upcoming=true", Some(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::OK);
    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert_eq!(titles(&feed), vec!["tomorrow", "still-running"]);

    let (_, body) = app.get("/feed/events", Some(Uuid::new_v4())).await;
    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert_eq!(feed.count, 3);
}

#[tokio::test]
async fn test_created_post_appears_in_feed() {
    let (app, student, class) = seeded_app();
    let author = Uuid::new_v4();
    assert_ok!(app.store.add_member(class, author));

    let (status, body) = app
        .post_json(
            "/posts",
            Some(author),
            json!({"class_id": class, "title": "Homework", "content": "Page 12"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let created: Post = assert_ok!(serde_json::from_value(body));
    assert_eq!(created.author_id, author);
    assert_eq!(created.scope, SourceScope::Class);

    let (_, body) = app.get("/feed/posts", Some(student)).await;
    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert_eq!(feed.items.first().map(TimedItem::id), Some(created.id));
}

#[tokio::test]
async fn test_outsider_cannot_write_to_class() {
    let (app, student, class) = seeded_app();
    let outsider = Uuid::new_v4();

    let (status, body) = app
        .post_json(
            "/posts",
            Some(outsider),
            json!({"class_id": class, "title": "spam", "content": "buy now"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);

    let start = Utc::now() + Duration::days(1);
    let (status, _) = app
        .post_json(
            "/events",
            Some(outsider),
            json!({"class_id": class, "title": "spam", "start": start, "end": start}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get("/feed/posts", Some(student)).await;
    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert!(!titles(&feed).contains(&"spam".to_string()));

    let (_, body) = app.get("/feed/events", Some(student)).await;
    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert_eq!(feed.count, 0);
}

#[tokio::test]
async fn test_school_wide_post_needs_no_membership() {
    let (app, student, _) = seeded_app();
    let (status, _) = app
        .post_json("/posts", Some(Uuid::new_v4()), json!({"title": "Assembly", "content": "9am"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/feed/posts", Some(student)).await;
    let feed: FeedResponse = assert_ok!(serde_json::from_value(body));
    assert_eq!(titles(&feed).first().map(String::as_str), Some("Assembly"));
}

#[tokio::test]
async fn test_invalid_post_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .post_json("/posts", Some(Uuid::new_v4()), json!({"title": " ", "content": "x"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_post_to_unknown_class() {
    let app = TestApp::new();
    let (status, _) = app
        .post_json(
            "/posts",
            Some(Uuid::new_v4()),
            json!({"class_id": Uuid::new_v4(), "title": "Hi", "content": "x"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_ending_before_start_is_rejected() {
    let app = TestApp::new();
    let start = Utc::now();
    let (status, _) = app
        .post_json(
            "/events",
            Some(Uuid::new_v4()),
            json!({
                "title": "Backwards",
                "start": start,
                "end": start - Duration::hours(2),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();
    let (status, body) = app.get("/nope", Some(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}
