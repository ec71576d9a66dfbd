//! Merge-by-time
//!
//! Interleaves two feeds that are each already sorted newest first into a
//! single newest-first feed in one linear pass.
//!
//! When an item of `primary` and an item of `secondary` carry the same
//! timestamp the `primary` item comes first. The feed handlers pass the
//! school-wide source as `primary`, so school announcements win ties against
//! class items.

use super::item::Timed;

/// Merge two descending-sorted sequences into one descending sequence
///
/// For each `primary` element, every remaining `secondary` element that is
/// strictly newer is emitted before it. Whatever is left of `secondary`
/// once `primary` runs out is appended in order.
///
/// Both inputs must already be sorted newest first. Debug builds assert it;
/// release builds trust the caller.
///
/// # Example
///
/// ```rust
/// use chrono::{DateTime, TimeZone, Utc};
/// use classboard::shared::feed::{merge_by_time, Timed};
///
/// struct Item(i64);
/// impl Timed for Item {
///     fn ordering_timestamp(&self) -> DateTime<Utc> {
///         Utc.timestamp_opt(self.0, 0).unwrap()
///     }
/// }
///
/// let merged = merge_by_time(vec![Item(9), Item(5)], vec![Item(8), Item(1)]);
/// let order: Vec<i64> = merged.iter().map(|i| i.0).collect();
/// assert_eq!(order, vec![9, 8, 5, 1]);
/// ```
pub fn merge_by_time<T: Timed>(primary: Vec<T>, secondary: Vec<T>) -> Vec<T> {
    debug_assert!(
        is_sorted_desc(&primary),
        "merge_by_time: primary input is not sorted newest first"
    );
    debug_assert!(
        is_sorted_desc(&secondary),
        "merge_by_time: secondary input is not sorted newest first"
    );

    let mut merged = Vec::with_capacity(primary.len() + secondary.len());
    let mut secondary = secondary.into_iter().peekable();

    for item in primary {
        let cutoff = item.ordering_timestamp();
        while let Some(newer) = secondary.next_if(|s| s.ordering_timestamp() > cutoff) {
            merged.push(newer);
        }
        merged.push(item);
    }

    merged.extend(secondary);
    merged
}

/// Whether `items` is sorted by ordering timestamp, newest first
pub fn is_sorted_desc<T: Timed>(items: &[T]) -> bool {
    items
        .windows(2)
        .all(|pair| pair[0].ordering_timestamp() >= pair[1].ordering_timestamp())
}
