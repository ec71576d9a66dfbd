//! Feed API request and response types
//!
//! Bodies of the feed endpoints. The author of a new post or event is never
//! taken from the body; the server fills it in from the principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::TimedItem;
use crate::shared::error::SharedError;

/// Longest title accepted for a post or event
pub const MAX_TITLE_LEN: usize = 200;

/// Body of `POST /posts`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatePostRequest {
    /// Target class, omitted for a school-wide post
    #[serde(default)]
    pub class_id: Option<Uuid>,
    pub title: String,
    pub content: String,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), SharedError> {
        validate_title(&self.title)?;
        if self.content.trim().is_empty() {
            return Err(SharedError::validation("content", "must not be empty"));
        }
        Ok(())
    }
}

/// Body of `POST /events`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateEventRequest {
    /// Target class, omitted for a school-wide event
    #[serde(default)]
    pub class_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<(), SharedError> {
        validate_title(&self.title)?;
        if self.end < self.start {
            return Err(SharedError::validation("end", "must not be before start"));
        }
        Ok(())
    }
}

/// Body returned by the feed endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedResponse {
    pub items: Vec<TimedItem>,
    pub count: usize,
}

impl From<Vec<TimedItem>> for FeedResponse {
    fn from(items: Vec<TimedItem>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

fn validate_title(title: &str) -> Result<(), SharedError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SharedError::validation("title", "must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(SharedError::validation(
            "title",
            format!("must be at most {} characters", MAX_TITLE_LEN),
        ));
    }
    Ok(())
}
