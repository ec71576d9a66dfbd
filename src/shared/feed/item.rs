/**
 * Feed Item Types
 *
 * Events and posts are the two kinds of entries that appear on a class
 * board. Both carry a single instant the feed is ordered by: the start of
 * an event, the creation time of a post.
 *
 * The wire form is a tagged union with a `kind` discriminant so clients never
 * have to guess the variant from which fields happen to be present:
 *
 * ```json
 * {"kind":"post","id":"...","scope":"class","created_at":"2025-03-01T08:00:00Z", ...}
 * ```
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anything that can be placed on a time-ordered feed
pub trait Timed {
    /// Instant the feed is ordered by (descending)
    fn ordering_timestamp(&self) -> DateTime<Utc>;
}

/// Which query source an item came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceScope {
    /// Visible to the whole school
    School,
    /// Visible to the members of one class
    Class,
}

/// Which kind of item a feed request asks for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Event,
    Post,
}

/// A calendar event with an explicit start and end
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    pub scope: SourceScope,
    /// Owning class, `None` for school-wide events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Uuid>,
    pub author_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A board post with a single creation instant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: Uuid,
    pub scope: SourceScope,
    /// Owning class, `None` for school-wide posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Uuid>,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One entry of a merged feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimedItem {
    Event(Event),
    Post(Post),
}

impl TimedItem {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Event(event) => event.id,
            Self::Post(post) => post.id,
        }
    }

    pub fn scope(&self) -> SourceScope {
        match self {
            Self::Event(event) => event.scope,
            Self::Post(post) => post.scope,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Event(_) => ItemKind::Event,
            Self::Post(_) => ItemKind::Post,
        }
    }

    /// Instant after which the item no longer counts as "current"
    ///
    /// Events stay current until they end, posts from the moment they
    /// are created.
    pub fn horizon(&self) -> DateTime<Utc> {
        match self {
            Self::Event(event) => event.end,
            Self::Post(post) => post.created_at,
        }
    }
}

impl Timed for Event {
    fn ordering_timestamp(&self) -> DateTime<Utc> {
        self.start
    }
}

impl Timed for Post {
    fn ordering_timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timed for TimedItem {
    fn ordering_timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Event(event) => event.ordering_timestamp(),
            Self::Post(post) => post.ordering_timestamp(),
        }
    }
}

impl From<Event> for TimedItem {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<Post> for TimedItem {
    fn from(post: Post) -> Self {
        Self::Post(post)
    }
}
