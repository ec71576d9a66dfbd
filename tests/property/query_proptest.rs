//! Property-based tests for FeedQuery filters

use chrono::Duration;
use classboard::shared::feed::{is_sorted_desc, UPCOMING_WINDOW_HOURS};
use classboard::shared::{FeedQuery, SourceScope, TimedItem};
use proptest::prelude::*;

use crate::common::{base_time, post_at};

fn newest_first(hours: Vec<i64>) -> Vec<TimedItem> {
    let mut hours = hours;
    hours.sort_unstable_by(|a, b| b.cmp(a));
    hours.into_iter().map(|h| post_at(SourceScope::Class, h)).collect()
}

fn query() -> impl Strategy<Value = FeedQuery> {
    (prop::option::of(1usize..10), any::<bool>())
        .prop_map(|(limit, upcoming_only)| FeedQuery { limit, upcoming_only })
}

proptest! {
    #[test]
    fn test_limit_bounds_length(hours in prop::collection::vec(-96i64..96, 0..30), query in query()) {
        let items = newest_first(hours);
        let kept = query.apply(items.clone(), base_time());

        prop_assert!(kept.len() <= items.len());
        if let Some(limit) = query.limit {
            prop_assert!(kept.len() <= limit);
        }
    }

    #[test]
    fn test_upcoming_respects_cutoff(hours in prop::collection::vec(-96i64..96, 0..30)) {
        let now = base_time();
        let kept = FeedQuery::default().upcoming().apply(newest_first(hours.clone()), now);

        let cutoff = now - Duration::hours(UPCOMING_WINDOW_HOURS);
        prop_assert!(kept.iter().all(|item| item.horizon() >= cutoff));

        let expected = hours.iter().filter(|h| **h >= -UPCOMING_WINDOW_HOURS).count();
        prop_assert_eq!(kept.len(), expected);
    }

    #[test]
    fn test_filtered_source_stays_sorted_prefix(
        hours in prop::collection::vec(-96i64..96, 0..30),
        query in query(),
    ) {
        let items = newest_first(hours);
        let kept = query.apply(items.clone(), base_time());

        prop_assert!(is_sorted_desc(&kept));
        if !query.upcoming_only {
            prop_assert_eq!(&kept[..], &items[..kept.len()]);
        }
    }
}
