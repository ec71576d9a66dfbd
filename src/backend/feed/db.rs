/**
 * Database Operations for Posts and Events
 *
 * PostgreSQL implementation of [`FeedStore`]. Filters run inside the query:
 * the "upcoming" cutoff is a `WHERE` clause and the per-source cap is a
 * `LIMIT`, so each source is filtered before the two are merged.
 *
 * # Tables
 *
 * - `classes` / `class_members` - class roster
 * - `posts` - board posts, `class_id IS NULL` for school-wide posts
 * - `events` - calendar events, same scoping rule
 */

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{FeedError, FeedStore, NewEvent, NewPost};
use crate::shared::{Event, FeedQuery, ItemKind, Post, SourceScope, TimedItem};

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    class_id: Option<Uuid>,
    author_id: Uuid,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            scope: scope_of(row.class_id),
            class_id: row.class_id,
            author_id: row.author_id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    class_id: Option<Uuid>,
    author_id: Uuid,
    title: String,
    description: String,
    location: Option<String>,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            scope: scope_of(row.class_id),
            class_id: row.class_id,
            author_id: row.author_id,
            title: row.title,
            description: row.description,
            location: row.location,
            start: row.start_at,
            end: row.end_at,
        }
    }
}

fn scope_of(class_id: Option<Uuid>) -> SourceScope {
    match class_id {
        Some(_) => SourceScope::Class,
        None => SourceScope::School,
    }
}

/// `LIMIT NULL` means no limit in PostgreSQL
fn sql_limit(query: &FeedQuery) -> Option<i64> {
    query
        .limit
        .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX))
}

/// Feed store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgFeedStore {
    pool: PgPool,
}

impl PgFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn class_exists(&self, class_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM classes WHERE id = $1)")
            .bind(class_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn ensure_class(&self, class_id: Option<Uuid>) -> Result<(), FeedError> {
        if let Some(id) = class_id {
            if !self.class_exists(id).await? {
                return Err(FeedError::NotFound(format!("Class {}", id)));
            }
        }
        Ok(())
    }
}

/// Load school-wide posts, newest first
pub async fn load_school_posts(
    pool: &PgPool,
    query: &FeedQuery,
) -> Result<Vec<Post>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PostRow>(
        r#"
        SELECT id, class_id, author_id, title, content, created_at
        FROM posts
        WHERE class_id IS NULL
          AND ($1::timestamptz IS NULL OR created_at >= $1)
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(query.cutoff(Utc::now()))
    .bind(sql_limit(query))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Post::from).collect())
}

/// Load posts from the classes `user_id` belongs to, newest first
pub async fn load_class_posts(
    pool: &PgPool,
    user_id: Uuid,
    query: &FeedQuery,
) -> Result<Vec<Post>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PostRow>(
        r#"
        SELECT p.id, p.class_id, p.author_id, p.title, p.content, p.created_at
        FROM posts p
        JOIN class_members m ON m.class_id = p.class_id
        WHERE m.user_id = $1
          AND ($2::timestamptz IS NULL OR p.created_at >= $2)
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(query.cutoff(Utc::now()))
    .bind(sql_limit(query))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Post::from).collect())
}

/// Load school-wide events, latest start first
///
/// The cutoff applies to the end of the event so that one still running
/// stays on an "upcoming" feed.
pub async fn load_school_events(
    pool: &PgPool,
    query: &FeedQuery,
) -> Result<Vec<Event>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT id, class_id, author_id, title, description, location, start_at, end_at
        FROM events
        WHERE class_id IS NULL
          AND ($1::timestamptz IS NULL OR end_at >= $1)
        ORDER BY start_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(query.cutoff(Utc::now()))
    .bind(sql_limit(query))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Event::from).collect())
}

/// Load events from the classes `user_id` belongs to, latest start first
pub async fn load_class_events(
    pool: &PgPool,
    user_id: Uuid,
    query: &FeedQuery,
) -> Result<Vec<Event>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT e.id, e.class_id, e.author_id, e.title, e.description, e.location,
               e.start_at, e.end_at
        FROM events e
        JOIN class_members m ON m.class_id = e.class_id
        WHERE m.user_id = $1
          AND ($2::timestamptz IS NULL OR e.end_at >= $2)
        ORDER BY e.start_at DESC, e.id DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(query.cutoff(Utc::now()))
    .bind(sql_limit(query))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Event::from).collect())
}

/// Insert a post and return the stored row
pub async fn save_post(pool: &PgPool, post: &NewPost) -> Result<Post, sqlx::Error> {
    let row = sqlx::query_as::<_, PostRow>(
        r#"
        INSERT INTO posts (id, class_id, author_id, title, content, created_at)
        VALUES (gen_random_uuid(), $1, $2, $3, $4, NOW())
        RETURNING id, class_id, author_id, title, content, created_at
        "#,
    )
    .bind(post.class_id)
    .bind(post.author_id)
    .bind(&post.title)
    .bind(&post.content)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Insert an event and return the stored row
pub async fn save_event(pool: &PgPool, event: &NewEvent) -> Result<Event, sqlx::Error> {
    let row = sqlx::query_as::<_, EventRow>(
        r#"
        INSERT INTO events (id, class_id, author_id, title, description, location, start_at, end_at, created_at)
        VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING id, class_id, author_id, title, description, location, start_at, end_at
        "#,
    )
    .bind(event.class_id)
    .bind(event.author_id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.location)
    .bind(event.start)
    .bind(event.end)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Members of one class, or of any class when `class_id` is `None`
pub async fn load_audience(pool: &PgPool, class_id: Option<Uuid>) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT DISTINCT user_id
        FROM class_members
        WHERE $1::uuid IS NULL OR class_id = $1
        ORDER BY user_id
        "#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await
}

/// Whether `user_id` is a member of `class_id`
pub async fn load_membership(pool: &PgPool, class_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM class_members WHERE class_id = $1 AND user_id = $2)",
    )
    .bind(class_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

impl FeedStore for PgFeedStore {
    fn school_items(
        &self,
        kind: ItemKind,
        query: FeedQuery,
    ) -> BoxFuture<'_, Result<Vec<TimedItem>, FeedError>> {
        async move {
            let items = match kind {
                ItemKind::Post => load_school_posts(&self.pool, &query)
                    .await?
                    .into_iter()
                    .map(TimedItem::from)
                    .collect(),
                ItemKind::Event => load_school_events(&self.pool, &query)
                    .await?
                    .into_iter()
                    .map(TimedItem::from)
                    .collect(),
            };
            Ok(items)
        }
        .boxed()
    }

    fn class_items(
        &self,
        principal: Uuid,
        kind: ItemKind,
        query: FeedQuery,
    ) -> BoxFuture<'_, Result<Vec<TimedItem>, FeedError>> {
        async move {
            let items = match kind {
                ItemKind::Post => load_class_posts(&self.pool, principal, &query)
                    .await?
                    .into_iter()
                    .map(TimedItem::from)
                    .collect(),
                ItemKind::Event => load_class_events(&self.pool, principal, &query)
                    .await?
                    .into_iter()
                    .map(TimedItem::from)
                    .collect(),
            };
            Ok(items)
        }
        .boxed()
    }

    fn create_post(&self, post: NewPost) -> BoxFuture<'_, Result<Post, FeedError>> {
        async move {
            self.ensure_class(post.class_id).await?;
            let post = save_post(&self.pool, &post).await?;
            tracing::info!("[Feed] Saved post {}", post.id);
            Ok(post)
        }
        .boxed()
    }

    fn create_event(&self, event: NewEvent) -> BoxFuture<'_, Result<Event, FeedError>> {
        async move {
            self.ensure_class(event.class_id).await?;
            let event = save_event(&self.pool, &event).await?;
            tracing::info!("[Feed] Saved event {}", event.id);
            Ok(event)
        }
        .boxed()
    }

    fn audience(&self, class_id: Option<Uuid>) -> BoxFuture<'_, Result<Vec<Uuid>, FeedError>> {
        async move {
            self.ensure_class(class_id).await?;
            Ok(load_audience(&self.pool, class_id).await?)
        }
        .boxed()
    }

    fn is_member(&self, class_id: Uuid, user_id: Uuid) -> BoxFuture<'_, Result<bool, FeedError>> {
        async move {
            self.ensure_class(Some(class_id)).await?;
            Ok(load_membership(&self.pool, class_id, user_id).await?)
        }
        .boxed()
    }
}
