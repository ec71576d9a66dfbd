//! In-process transport
//!
//! `MemoryBus` plays the part of the external message bus inside one
//! process. Each `connect()` opens an independent connection, the way each
//! server process would hold its own connection to Redis, so two brokers on
//! the same bus behave like two processes sharing a pub/sub server.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Transport, TransportError, TransportEvent};

struct Connection {
    channels: HashSet<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

#[derive(Default)]
struct BusState {
    next_connection: u64,
    connections: HashMap<u64, Connection>,
    subscribe_calls: HashMap<String, usize>,
    unsubscribe_calls: HashMap<String, usize>,
}

/// Shared in-process message bus
#[derive(Clone, Default)]
pub struct MemoryBus {
    state: Arc<Mutex<BusState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection to the bus
    pub fn connect(&self) -> (MemoryTransport, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, inbound) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        let id = state.next_connection;
        state.next_connection += 1;
        state.connections.insert(
            id,
            Connection {
                channels: HashSet::new(),
                events,
            },
        );

        let transport = MemoryTransport {
            id,
            bus: self.clone(),
            closed: AtomicBool::new(false),
        };
        (transport, inbound)
    }

    /// Number of open connections subscribed to `channel`
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.state
            .lock()
            .connections
            .values()
            .filter(|conn| conn.channels.contains(channel))
            .count()
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Subscribe calls received for `channel` over the bus lifetime
    pub fn subscribe_calls(&self, channel: &str) -> usize {
        self.state.lock().subscribe_calls.get(channel).copied().unwrap_or(0)
    }

    /// Unsubscribe calls received for `channel` over the bus lifetime
    pub fn unsubscribe_calls(&self, channel: &str) -> usize {
        self.state.lock().unsubscribe_calls.get(channel).copied().unwrap_or(0)
    }

    /// Inject a raw payload as if some publisher had sent it
    pub fn inject(&self, channel: &str, payload: impl Into<String>) -> usize {
        self.fan_out(channel, payload.into())
    }

    /// Drop every connection's subscriptions and report the outage
    ///
    /// Connections stay open, like a client that reconnected to a restarted
    /// server: calls succeed again, but nothing is subscribed anymore.
    pub fn drop_subscriptions(&self, reason: &str) {
        let mut state = self.state.lock();
        for conn in state.connections.values_mut() {
            conn.channels.clear();
            let _ = conn.events.send(TransportEvent::Disconnected {
                reason: reason.to_string(),
            });
        }
    }

    fn fan_out(&self, channel: &str, payload: String) -> usize {
        let state = self.state.lock();
        let mut delivered = 0;
        for conn in state.connections.values() {
            if !conn.channels.contains(channel) {
                continue;
            }
            let event = TransportEvent::Message {
                channel: channel.to_string(),
                payload: payload.clone(),
            };
            if conn.events.send(event).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

/// One connection to a `MemoryBus`
pub struct MemoryTransport {
    id: u64,
    bus: MemoryBus,
    closed: AtomicBool,
}

impl MemoryTransport {
    fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut BusState, u64) -> R,
    ) -> Result<R, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Unavailable("connection closed".to_string()));
        }
        let mut state = self.bus.state.lock();
        if !state.connections.contains_key(&self.id) {
            return Err(TransportError::Unavailable("connection closed".to_string()));
        }
        Ok(f(&mut state, self.id))
    }
}

impl Transport for MemoryTransport {
    fn subscribe<'a>(&'a self, channel: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        let result = self.with_connection(|state, id| {
            *state.subscribe_calls.entry(channel.to_string()).or_default() += 1;
            if let Some(conn) = state.connections.get_mut(&id) {
                conn.channels.insert(channel.to_string());
            }
        });
        future::ready(result).boxed()
    }

    fn unsubscribe<'a>(&'a self, channel: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        let result = self.with_connection(|state, id| {
            *state.unsubscribe_calls.entry(channel.to_string()).or_default() += 1;
            if let Some(conn) = state.connections.get_mut(&id) {
                conn.channels.remove(channel);
            }
        });
        future::ready(result).boxed()
    }

    fn publish<'a>(
        &'a self,
        channel: &'a str,
        payload: String,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        let result = self
            .with_connection(|_, _| ())
            .map(|()| {
                self.bus.fan_out(channel, payload);
            });
        future::ready(result).boxed()
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.closed.store(true, Ordering::Release);
        self.bus.state.lock().connections.remove(&self.id);
        future::ready(()).boxed()
    }
}
