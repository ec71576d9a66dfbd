/**
 * Feed Store Interface
 *
 * The feed handlers never talk to a database directly. They go through a
 * [`FeedStore`], which answers the two feed queries and records new posts
 * and events.
 *
 * # Query Contract
 *
 * - `school_items` returns school-wide items of one kind
 * - `class_items` returns items of one kind from every class the principal
 *   is a member of
 * - both are sorted by ordering timestamp, newest first
 * - both apply the `FeedQuery` filters themselves (cutoff, then limit)
 *
 * # Implementations
 *
 * - `PgFeedStore` - PostgreSQL through `sqlx`
 * - `MemoryFeedStore` - in-process, for servers without `DATABASE_URL` and
 *   for tests
 */

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::{CreateEventRequest, CreatePostRequest, Event, FeedQuery, ItemKind, Post, SharedError, TimedItem};

/// Errors raised by a feed store
#[derive(Debug, Error)]
pub enum FeedError {
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Principal may not write to the referenced class
    #[error("{0}")]
    Forbidden(String),

    /// Input rejected before it reached storage
    #[error(transparent)]
    Invalid(#[from] SharedError),
}

/// A post about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: Uuid,
    pub class_id: Option<Uuid>,
    pub title: String,
    pub content: String,
}

impl NewPost {
    /// Build from a request body on behalf of `author_id`
    pub fn from_request(author_id: Uuid, request: CreatePostRequest) -> Result<Self, SharedError> {
        request.validate()?;
        Ok(Self {
            author_id,
            class_id: request.class_id,
            title: request.title.trim().to_string(),
            content: request.content,
        })
    }
}

/// An event about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub author_id: Uuid,
    pub class_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl NewEvent {
    /// Build from a request body on behalf of `author_id`
    pub fn from_request(author_id: Uuid, request: CreateEventRequest) -> Result<Self, SharedError> {
        request.validate()?;
        Ok(Self {
            author_id,
            class_id: request.class_id,
            title: request.title.trim().to_string(),
            description: request.description,
            location: request.location.filter(|location| !location.trim().is_empty()),
            start: request.start,
            end: request.end,
        })
    }
}

/// Source of feed items and sink for new ones
pub trait FeedStore: Send + Sync + 'static {
    /// School-wide items of `kind`, newest first
    fn school_items(
        &self,
        kind: ItemKind,
        query: FeedQuery,
    ) -> BoxFuture<'_, Result<Vec<TimedItem>, FeedError>>;

    /// Items of `kind` from the classes `principal` belongs to, newest first
    fn class_items(
        &self,
        principal: Uuid,
        kind: ItemKind,
        query: FeedQuery,
    ) -> BoxFuture<'_, Result<Vec<TimedItem>, FeedError>>;

    /// Persist a post; fails with `NotFound` for an unknown class
    fn create_post(&self, post: NewPost) -> BoxFuture<'_, Result<Post, FeedError>>;

    /// Persist an event; fails with `NotFound` for an unknown class
    fn create_event(&self, event: NewEvent) -> BoxFuture<'_, Result<Event, FeedError>>;

    /// Users to notify about an item in `class_id`
    ///
    /// Members of the class, or for school-wide items (`None`) every user
    /// that belongs to at least one class.
    fn audience(&self, class_id: Option<Uuid>) -> BoxFuture<'_, Result<Vec<Uuid>, FeedError>>;

    /// Whether `user_id` belongs to `class_id`; `NotFound` for an unknown class
    fn is_member(&self, class_id: Uuid, user_id: Uuid) -> BoxFuture<'_, Result<bool, FeedError>>;
}
