//! Property-based tests for merge_by_time
//!
//! Sources are generated as descending hour offsets, so ties between and
//! within sources come up often.

use std::collections::HashSet;

use classboard::shared::feed::{is_sorted_desc, merge_by_time};
use classboard::shared::{SourceScope, TimedItem};
use proptest::prelude::*;

use crate::common::{event_at, offsets, post_at};

fn source(scope: SourceScope, hours: &[i64], events: bool) -> Vec<TimedItem> {
    let mut hours = hours.to_vec();
    hours.sort_unstable_by(|a, b| b.cmp(a));
    hours
        .into_iter()
        .map(|h| if events { event_at(scope, h) } else { post_at(scope, h) })
        .collect()
}

fn ids_of(items: &[TimedItem]) -> Vec<uuid::Uuid> {
    items.iter().map(TimedItem::id).collect()
}

fn hours() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-48i64..48, 0..20)
}

proptest! {
    #[test]
    fn test_merge_is_sorted(school in hours(), class in hours(), events in any::<bool>()) {
        let merged = merge_by_time(
            source(SourceScope::School, &school, events),
            source(SourceScope::Class, &class, events),
        );
        prop_assert!(is_sorted_desc(&merged));
    }

    #[test]
    fn test_merge_keeps_every_item(school in hours(), class in hours()) {
        let school = source(SourceScope::School, &school, false);
        let class = source(SourceScope::Class, &class, false);
        let expected: HashSet<_> = ids_of(&school).into_iter().chain(ids_of(&class)).collect();

        let merged = merge_by_time(school.clone(), class.clone());

        prop_assert_eq!(merged.len(), school.len() + class.len());
        prop_assert_eq!(ids_of(&merged).into_iter().collect::<HashSet<_>>(), expected);
    }

    #[test]
    fn test_merge_preserves_source_order(school in hours(), class in hours()) {
        let school = source(SourceScope::School, &school, false);
        let class = source(SourceScope::Class, &class, false);

        let merged = merge_by_time(school.clone(), class.clone());

        let from = |scope| {
            merged
                .iter()
                .filter(|item| item.scope() == scope)
                .map(TimedItem::id)
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(from(SourceScope::School), ids_of(&school));
        prop_assert_eq!(from(SourceScope::Class), ids_of(&class));
    }

    #[test]
    fn test_school_first_on_ties(school in hours(), class in hours()) {
        let merged = merge_by_time(
            source(SourceScope::School, &school, false),
            source(SourceScope::Class, &class, false),
        );

        for pair in merged.windows(2) {
            if offsets(&pair[..1]) == offsets(&pair[1..]) {
                prop_assert!(
                    !(pair[0].scope() == SourceScope::Class && pair[1].scope() == SourceScope::School),
                    "class item placed before a school item with the same time"
                );
            }
        }
    }

    #[test]
    fn test_merge_with_empty_is_identity(items in hours()) {
        let items = source(SourceScope::School, &items, true);
        prop_assert_eq!(merge_by_time(items.clone(), Vec::new()), items.clone());
        prop_assert_eq!(merge_by_time(Vec::new(), items.clone()), items);
    }
}
