//! Real-time Update Module
//!
//! This module delivers "post created" and "event created" notifications to
//! connected clients, across every server process sharing one pub/sub bus.
//!
//! # Architecture
//!
//! The realtime module is organized into focused submodules:
//!
//! - **`broker`** - Channel registry, listener dispatch and shutdown
//! - **`transport`** - Pub/sub transports (Redis, in-process memory bus)
//! - **`subscription`** - Server-Sent Events endpoints backed by the broker
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── broker.rs       - LiveUpdateBroker and Subscription
//! ├── subscription.rs - SSE subscription handlers
//! └── transport/
//!     ├── mod.rs          - Transport trait and events
//!     ├── memory.rs       - In-process MemoryBus
//!     └── redis_pubsub.rs - Redis PUBLISH/SUBSCRIBE
//! ```
//!
//! # Channels
//!
//! - `post-created` - every new post, for every connected client
//! - `event-created:{user_id}` - new events addressed to one user
//!
//! A process holds at most one transport subscription per channel, no
//! matter how many SSE clients listen on it locally.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use classboard::backend::realtime::{LiveUpdateBroker, MemoryBus};
//! use classboard::shared::{LiveUpdate, POST_CREATED_CHANNEL};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (transport, inbound) = MemoryBus::new().connect();
//! let broker: LiveUpdateBroker<LiveUpdate> = LiveUpdateBroker::new(Arc::new(transport), inbound);
//!
//! let subscription = broker.subscribe(POST_CREATED_CHANNEL, |update: &LiveUpdate| {
//!     println!("{}", update.event_name());
//! })?;
//!
//! subscription.cancel();
//! broker.shutdown().await;
//! # Ok(())
//! # }
//! ```

/// Subscription registry and dispatch
pub mod broker;

/// Server-Sent Events subscription handlers
pub mod subscription;

/// Pub/sub transports
pub mod transport;

// Re-export commonly used types and functions
pub use broker::{
    BrokerError, ConnectionState, ListenerId, LiveUpdateBroker, Subscription, SubscriptionGuard,
};
pub use subscription::{handle_event_stream, handle_post_stream};
pub use transport::{MemoryBus, MemoryTransport, RedisTransport, Transport, TransportError, TransportEvent};
