/**
 * In-Memory Feed Store
 *
 * Keeps classes, memberships, posts and events in process memory. Used when
 * the server runs without `DATABASE_URL` and by the integration tests.
 *
 * Queries sort newest first and apply the `FeedQuery` filters in memory, so
 * they answer exactly like the PostgreSQL store.
 */

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use uuid::Uuid;

use super::store::{FeedError, FeedStore, NewEvent, NewPost};
use crate::shared::{Event, FeedQuery, ItemKind, Post, SourceScope, Timed, TimedItem};

#[derive(Debug, Default)]
struct StoreState {
    /// class id → member ids
    classes: HashMap<Uuid, BTreeSet<Uuid>>,
    posts: Vec<Post>,
    events: Vec<Event>,
}

/// Feed store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryFeedStore {
    state: RwLock<StoreState>,
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a class and return its id
    pub fn add_class(&self, name: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().classes.insert(id, BTreeSet::new());
        tracing::debug!("[Feed] Created class {} ({})", name.into(), id);
        id
    }

    /// Add `user_id` to a class
    pub fn add_member(&self, class_id: Uuid, user_id: Uuid) -> Result<(), FeedError> {
        let mut state = self.state.write();
        let members = state
            .classes
            .get_mut(&class_id)
            .ok_or_else(|| FeedError::NotFound(format!("Class {}", class_id)))?;
        members.insert(user_id);
        Ok(())
    }

    /// Store an already built post as is (fixtures, imports)
    pub fn insert_post(&self, post: Post) {
        self.state.write().posts.push(post);
    }

    /// Store an already built event as is (fixtures, imports)
    pub fn insert_event(&self, event: Event) {
        self.state.write().events.push(event);
    }

    fn select<F>(&self, kind: ItemKind, query: FeedQuery, visible: F) -> Vec<TimedItem>
    where
        F: Fn(Option<Uuid>) -> bool,
    {
        let mut items: Vec<TimedItem> = {
            let state = self.state.read();
            match kind {
                ItemKind::Post => state
                    .posts
                    .iter()
                    .filter(|post| visible(post.class_id))
                    .cloned()
                    .map(TimedItem::from)
                    .collect(),
                ItemKind::Event => state
                    .events
                    .iter()
                    .filter(|event| visible(event.class_id))
                    .cloned()
                    .map(TimedItem::from)
                    .collect(),
            }
        };

        // Newest first; id breaks ties so repeated queries agree.
        items.sort_by(|a, b| {
            b.ordering_timestamp()
                .cmp(&a.ordering_timestamp())
                .then_with(|| b.id().cmp(&a.id()))
        });

        query.apply(items, Utc::now())
    }

    fn ensure_class(&self, class_id: Option<Uuid>) -> Result<(), FeedError> {
        match class_id {
            Some(id) if !self.state.read().classes.contains_key(&id) => {
                Err(FeedError::NotFound(format!("Class {}", id)))
            }
            _ => Ok(()),
        }
    }
}

fn scope_of(class_id: Option<Uuid>) -> SourceScope {
    match class_id {
        Some(_) => SourceScope::Class,
        None => SourceScope::School,
    }
}

impl FeedStore for MemoryFeedStore {
    fn school_items(
        &self,
        kind: ItemKind,
        query: FeedQuery,
    ) -> BoxFuture<'_, Result<Vec<TimedItem>, FeedError>> {
        async move { Ok(self.select(kind, query, |class_id| class_id.is_none())) }.boxed()
    }

    fn class_items(
        &self,
        principal: Uuid,
        kind: ItemKind,
        query: FeedQuery,
    ) -> BoxFuture<'_, Result<Vec<TimedItem>, FeedError>> {
        async move {
            let joined: BTreeSet<Uuid> = self
                .state
                .read()
                .classes
                .iter()
                .filter(|(_, members)| members.contains(&principal))
                .map(|(id, _)| *id)
                .collect();

            Ok(self.select(kind, query, |class_id| {
                class_id.map_or(false, |id| joined.contains(&id))
            }))
        }
        .boxed()
    }

    fn create_post(&self, post: NewPost) -> BoxFuture<'_, Result<Post, FeedError>> {
        async move {
            self.ensure_class(post.class_id)?;

            let post = Post {
                id: Uuid::new_v4(),
                scope: scope_of(post.class_id),
                class_id: post.class_id,
                author_id: post.author_id,
                title: post.title,
                content: post.content,
                created_at: Utc::now(),
            };
            self.insert_post(post.clone());

            tracing::debug!("[Feed] Stored post {} in memory", post.id);
            Ok(post)
        }
        .boxed()
    }

    fn create_event(&self, event: NewEvent) -> BoxFuture<'_, Result<Event, FeedError>> {
        async move {
            self.ensure_class(event.class_id)?;

            let event = Event {
                id: Uuid::new_v4(),
                scope: scope_of(event.class_id),
                class_id: event.class_id,
                author_id: event.author_id,
                title: event.title,
                description: event.description,
                location: event.location,
                start: event.start,
                end: event.end,
            };
            self.insert_event(event.clone());

            tracing::debug!("[Feed] Stored event {} in memory", event.id);
            Ok(event)
        }
        .boxed()
    }

    fn audience(&self, class_id: Option<Uuid>) -> BoxFuture<'_, Result<Vec<Uuid>, FeedError>> {
        async move {
            let state = self.state.read();
            let members: BTreeSet<Uuid> = match class_id {
                Some(id) => state
                    .classes
                    .get(&id)
                    .ok_or_else(|| FeedError::NotFound(format!("Class {}", id)))?
                    .clone(),
                None => state
                    .classes
                    .values()
                    .flat_map(|members| members.iter().copied())
                    .collect(),
            };
            Ok(members.into_iter().collect())
        }
        .boxed()
    }

    fn is_member(&self, class_id: Uuid, user_id: Uuid) -> BoxFuture<'_, Result<bool, FeedError>> {
        async move {
            self.state
                .read()
                .classes
                .get(&class_id)
                .map(|members| members.contains(&user_id))
                .ok_or_else(|| FeedError::NotFound(format!("Class {}", class_id)))
        }
        .boxed()
    }
}
