//! Pub/Sub Transport
//!
//! The broker never talks to a message bus directly. It drives a
//! [`Transport`] for outbound calls and reads [`TransportEvent`]s from the
//! receiver handed out when the transport connection was opened.
//!
//! # Implementations
//!
//! - **`memory`** - in-process bus; every connection opened on the same
//!   `MemoryBus` sees the others' publishes (single node, tests)
//! - **`redis_pubsub`** - Redis `SUBSCRIBE`/`PUBLISH` over a dedicated pub/sub
//!   connection (multi-process deployments)
//!
//! # Contract
//!
//! - `subscribe`/`unsubscribe` are idempotent at the bus
//! - `publish` resolves once the bus accepted the payload, not once anyone
//!   received it
//! - inbound messages for one channel arrive in bus order
//! - a lost connection is reported once as `TransportEvent::Disconnected`
//! - `reconnect` restores the inbound side, after which channels can be
//!   subscribed again

use futures_util::future::{self, BoxFuture, FutureExt};
use thiserror::Error;

pub mod memory;
pub mod redis_pubsub;

pub use memory::{MemoryBus, MemoryTransport};
pub use redis_pubsub::RedisTransport;

/// Errors raised by a transport call
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection is down or was closed
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    /// Error reported by the Redis client
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Event pushed by a transport connection to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Raw payload published on `channel`
    Message { channel: String, payload: String },
    /// Connection to the bus was lost
    Disconnected { reason: String },
}

/// Outbound side of a pub/sub connection
pub trait Transport: Send + Sync + 'static {
    /// Start receiving messages published on `channel`
    fn subscribe<'a>(&'a self, channel: &'a str) -> BoxFuture<'a, Result<(), TransportError>>;

    /// Stop receiving messages published on `channel`
    fn unsubscribe<'a>(&'a self, channel: &'a str) -> BoxFuture<'a, Result<(), TransportError>>;

    /// Hand `payload` to the bus for fan-out on `channel`
    fn publish<'a>(
        &'a self,
        channel: &'a str,
        payload: String,
    ) -> BoxFuture<'a, Result<(), TransportError>>;

    /// Re-open the inbound side after a `Disconnected` event
    ///
    /// Server-side subscriptions are not restored; the caller subscribes
    /// again. Transports whose connection survives an outage keep the
    /// default no-op.
    fn reconnect(&self) -> BoxFuture<'_, Result<(), TransportError>> {
        future::ready(Ok(())).boxed()
    }

    /// Release the connection; later calls fail with `Unavailable`
    fn close(&self) -> BoxFuture<'_, ()>;
}
