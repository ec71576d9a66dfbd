//! Classboard - Feed and Live Update Core
//!
//! Backend core of a school communication platform: class boards with
//! posts and events, read as one time-ordered feed and kept fresh through
//! live updates.
//!
//! # Overview
//!
//! - **Merged feed**: school-wide and class-scoped items, each sorted newest
//!   first, interleaved into one newest-first feed
//! - **Live updates**: channel based pub/sub fan-out of "post created" and
//!   "event created" notifications, across processes through Redis
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared by server and clients
//!   - Feed items, the merge, feed filters, request bodies
//!   - Live update payloads and channel names
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP server
//!   - Feed store (PostgreSQL or in-memory)
//!   - Live update broker, Redis and in-process transports, SSE streams
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables the backend modules and the server binary
//!
//! # Usage
//!
//! ```rust
//! use classboard::shared::feed::{merge_by_time, Timed};
//! use chrono::{DateTime, TimeZone, Utc};
//!
//! struct Item(DateTime<Utc>);
//!
//! impl Timed for Item {
//!     fn ordering_timestamp(&self) -> DateTime<Utc> {
//!         self.0
//!     }
//! }
//!
//! let at = |h| Item(Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap());
//! let feed = merge_by_time(vec![at(9), at(5)], vec![at(8), at(1)]);
//! let hours: Vec<_> = feed.iter().map(|i| i.0.format("%H").to_string()).collect();
//! assert_eq!(hours, ["09", "08", "05", "01"]);
//! ```
//!
//! # Error Handling
//!
//! - `Result<T, E>` with `thiserror` error enums
//! - `shared::error` for payload validation
//! - `backend::error` for HTTP mapping

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
