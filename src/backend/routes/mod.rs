//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//! Routes are organized by functionality into focused submodules.
//!
//! # Architecture
//!
//! - **`router`** - Main router creation and route assembly
//! - **`feed_routes`** - Feed reads, post and event creation
//! - **`live_routes`** - Server-Sent Events streams
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation
//! ├── feed_routes.rs  - Feed endpoints
//! └── live_routes.rs  - Live update endpoints
//! ```
//!
//! # Routes
//!
//! - `GET /health`
//! - `GET /feed/posts?limit=&upcoming=`
//! - `GET /feed/events?limit=&upcoming=`
//! - `POST /posts`
//! - `POST /events`
//! - `GET /live/posts`
//! - `GET /live/events`

/// Main router creation
pub mod router;

/// Feed endpoints
pub mod feed_routes;

/// Live update endpoints
pub mod live_routes;

// Re-export commonly used functions
pub use router::create_router;
