//! Feed Module
//!
//! Storage and HTTP surface of the class board feed.
//!
//! # Architecture
//!
//! - **`store`** - `FeedStore` trait, `FeedError`, validated `NewPost`/`NewEvent`
//! - **`db`** - PostgreSQL store (`sqlx`)
//! - **`memory`** - in-process store
//! - **`service`** - concurrent per-source queries merged into one feed
//! - **`handlers`** - `/feed/*`, `/posts` and `/events` endpoints
//!
//! # Module Structure
//!
//! ```text
//! feed/
//! ├── mod.rs      - Module exports and documentation
//! ├── store.rs    - Store trait and input types
//! ├── db.rs       - PostgreSQL queries
//! ├── memory.rs   - In-memory store
//! ├── service.rs  - Feed assembly
//! └── handlers.rs - HTTP handlers
//! ```

/// Store trait and input types
pub mod store;

/// PostgreSQL store
pub mod db;

/// In-memory store
pub mod memory;

/// Feed assembly
pub mod service;

/// HTTP handlers
pub mod handlers;

pub use db::PgFeedStore;
pub use memory::MemoryFeedStore;
pub use service::load_feed;
pub use store::{FeedError, FeedStore, NewEvent, NewPost};
