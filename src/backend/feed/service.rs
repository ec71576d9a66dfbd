//! Merged feed assembly
//!
//! Queries the school-wide and class sources concurrently and merges them
//! with school items as the primary sequence, so on equal timestamps the
//! school item comes first.

use uuid::Uuid;

use super::store::{FeedError, FeedStore};
use crate::shared::{merge_by_time, FeedQuery, ItemKind, TimedItem};

/// Build the feed of `kind` that `principal` sees
pub async fn load_feed(
    store: &dyn FeedStore,
    principal: Uuid,
    kind: ItemKind,
    query: FeedQuery,
) -> Result<Vec<TimedItem>, FeedError> {
    let (school, class) = tokio::try_join!(
        store.school_items(kind, query),
        store.class_items(principal, kind, query),
    )?;

    tracing::debug!(
        "[Feed] Merging {} school and {} class {:?} items for {}",
        school.len(),
        class.len(),
        kind,
        principal
    );

    Ok(merge_by_time(school, class))
}
