//! Per-source feed filters
//!
//! A feed request may cap the number of items and may ask for "upcoming"
//! items only, meaning anything still relevant within the last 24 hours.
//! Filters are applied to each source before the two sources are merged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::item::TimedItem;

/// How far back an "upcoming" feed reaches
pub const UPCOMING_WINDOW_HOURS: i64 = 24;

/// Filters applied to a single query source
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedQuery {
    /// Maximum number of items taken from each source
    #[serde(default)]
    pub limit: Option<usize>,
    /// Keep only events ending, or posts created, after `now - 24h`
    #[serde(default, rename = "upcoming")]
    pub upcoming_only: bool,
}

impl FeedQuery {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn upcoming(mut self) -> Self {
        self.upcoming_only = true;
        self
    }

    /// Earliest horizon an item may have, if the upcoming filter is on
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.upcoming_only
            .then(|| now - Duration::hours(UPCOMING_WINDOW_HOURS))
    }

    /// Apply the filters to one source's newest-first items
    ///
    /// The cutoff runs before the limit so a capped feed is filled with
    /// items that survive the cutoff.
    pub fn apply(&self, items: Vec<TimedItem>, now: DateTime<Utc>) -> Vec<TimedItem> {
        let cutoff = self.cutoff(now);
        let kept = items
            .into_iter()
            .filter(|item| cutoff.map_or(true, |cutoff| item.horizon() >= cutoff));

        match self.limit {
            Some(limit) => kept.take(limit).collect(),
            None => kept.collect(),
        }
    }
}
