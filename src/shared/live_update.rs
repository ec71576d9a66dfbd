/**
 * Live Update Messages
 *
 * Payloads published when a board mutation should refresh the feeds of
 * connected clients, and the channel names they are published on.
 *
 * # Channels
 *
 * - `post-created` - every new post, school-wide or class
 * - `event-created:{user_id}` - new events relevant to one user
 *
 * Timestamps are carried as `DateTime<Utc>`. Subscribers decode into
 * `LiveUpdate` itself, so instants come back as instants rather than
 * strings.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::feed::{Event, Post};

/// Channel carrying every newly created post
pub const POST_CREATED_CHANNEL: &str = "post-created";

/// Prefix of the per-user channels carrying newly created events
pub const EVENT_CREATED_PREFIX: &str = "event-created";

/// Channel a user listens on for events that concern them
pub fn event_created_channel(user_id: Uuid) -> String {
    format!("{EVENT_CREATED_PREFIX}:{user_id}")
}

/// Kind of live update, used as the SSE event name
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    PostCreated,
    EventCreated,
}

/// Message fanned out to subscribers after a post or event is created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveUpdate {
    PostCreated {
        post: Post,
        published_at: DateTime<Utc>,
    },
    EventCreated {
        event: Event,
        published_at: DateTime<Utc>,
    },
}

impl LiveUpdate {
    pub fn post_created(post: Post) -> Self {
        Self::PostCreated {
            post,
            published_at: Utc::now(),
        }
    }

    pub fn event_created(event: Event) -> Self {
        Self::EventCreated {
            event,
            published_at: Utc::now(),
        }
    }

    pub fn update_type(&self) -> UpdateType {
        match self {
            Self::PostCreated { .. } => UpdateType::PostCreated,
            Self::EventCreated { .. } => UpdateType::EventCreated,
        }
    }

    /// SSE event name for this update
    pub fn event_name(&self) -> &'static str {
        match self.update_type() {
            UpdateType::PostCreated => "post_created",
            UpdateType::EventCreated => "event_created",
        }
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        match self {
            Self::PostCreated { published_at, .. } | Self::EventCreated { published_at, .. } => {
                *published_at
            }
        }
    }
}
