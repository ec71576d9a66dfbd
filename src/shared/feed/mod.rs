//! Feed Types and Merging
//!
//! Platform-agnostic pieces of the class board feed:
//!
//! - **`item`** - `TimedItem` (event or post) and the `Timed` ordering trait
//! - **`merge`** - two-pointer merge of newest-first sequences
//! - **`query`** - per-source limit and "upcoming" filters
//! - **`request`** - bodies of the feed endpoints
//!
//! A feed request is answered by querying the school-wide source and the
//! class source separately, filtering each, then merging:
//!
//! ```rust
//! use classboard::shared::feed::{merge_by_time, FeedQuery, TimedItem};
//! use chrono::Utc;
//!
//! let school: Vec<TimedItem> = Vec::new();
//! let class: Vec<TimedItem> = Vec::new();
//! let query = FeedQuery::default().with_limit(20);
//! let now = Utc::now();
//!
//! let feed = merge_by_time(query.apply(school, now), query.apply(class, now));
//! assert!(feed.is_empty());
//! ```

pub mod item;
pub mod merge;
pub mod query;
pub mod request;

pub use item::{Event, ItemKind, Post, SourceScope, Timed, TimedItem};
pub use merge::{is_sorted_desc, merge_by_time};
pub use query::{FeedQuery, UPCOMING_WINDOW_HOURS};
pub use request::{CreateEventRequest, CreatePostRequest, FeedResponse, MAX_TITLE_LEN};
