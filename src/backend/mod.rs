//! Backend Module
//!
//! This module contains all server-side code for the classboard service:
//! the merged feed API and the live update fan-out behind it.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! The backend is organized into focused submodules:
//!
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`feed`** - Feed store (PostgreSQL / in-memory), merged feed, handlers
//! - **`realtime`** - Live update broker, pub/sub transports, SSE streams
//! - **`middleware`** - Principal extraction
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Server binary
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── feed/           - Feed storage and handlers
//! ├── realtime/       - Broker, transports, SSE
//! ├── middleware/     - Request extractors
//! └── error/          - Error types
//! ```
//!
//! # Request Flow
//!
//! A feed read queries the school-wide and class sources concurrently,
//! filters each, and merges them newest first. A write stores the item and
//! then publishes a `LiveUpdate`; every server process sharing the pub/sub
//! bus dispatches it to its local SSE listeners.
//!
//! # Error Handling
//!
//! - `BackendError` is returned from handlers and rendered as JSON
//! - feed store errors propagate to the caller
//! - live update errors are logged inside the broker

/// Server setup and configuration
#[cfg(feature = "ssr")]
pub mod server;

/// Route configuration
#[cfg(feature = "ssr")]
pub mod routes;

/// Feed storage and handlers
#[cfg(feature = "ssr")]
pub mod feed;

/// Real-time update system
#[cfg(feature = "ssr")]
pub mod realtime;

/// Backend error types
#[cfg(feature = "ssr")]
pub mod error;

/// Middleware for request processing
#[cfg(feature = "ssr")]
pub mod middleware;

/// Re-export commonly used types
#[cfg(feature = "ssr")]
pub use error::BackendError;
#[cfg(feature = "ssr")]
pub use realtime::{LiveUpdateBroker, Subscription};
#[cfg(feature = "ssr")]
pub use server::{build_state, create_app, AppState, ServerConfig};
