/**
 * Redis Pub/Sub Transport
 *
 * Cross-process fan-out through Redis `PUBLISH`/`SUBSCRIBE`.
 *
 * Two connections are held:
 * - a `ConnectionManager` for `PUBLISH` (multiplexed, reconnects on its own)
 * - a dedicated pub/sub connection, split into a sink for
 *   `SUBSCRIBE`/`UNSUBSCRIBE` and a stream that a forwarding task drains
 *   into the broker's inbound channel
 *
 * When the pub/sub stream ends the forwarder reports
 * `TransportEvent::Disconnected` and stops. Server-side subscriptions are
 * gone at that point. `reconnect` opens a fresh pub/sub connection that
 * feeds the same inbound channel; the broker's `resubscribe_all` calls it
 * before subscribing its channels again.
 */
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::StreamExt;
use parking_lot::Mutex;
use redis::aio::{ConnectionManager, PubSubSink, PubSubStream};
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Transport, TransportError, TransportEvent};

/// Transport backed by a Redis server
pub struct RedisTransport {
    client: redis::Client,
    publisher: ConnectionManager,
    sink: Mutex<PubSubSink>,
    events: mpsc::UnboundedSender<TransportEvent>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl RedisTransport {
    /// Connect to `url` and start forwarding inbound messages
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let client = redis::Client::open(url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        let (sink, stream) = client.get_async_pubsub().await?.split();

        let (events, inbound) = mpsc::unbounded_channel();
        let forwarder = spawn_forwarder(stream, events.clone());

        tracing::info!("[Realtime] Connected to Redis pub/sub");

        let transport = Self {
            client,
            publisher,
            sink: Mutex::new(sink),
            events,
            forwarder: Mutex::new(Some(forwarder)),
            closed: AtomicBool::new(false),
        };
        Ok((transport, inbound))
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Unavailable("redis transport closed".to_string()));
        }
        Ok(())
    }
}

impl Transport for RedisTransport {
    fn subscribe<'a>(&'a self, channel: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            self.ensure_open()?;
            let mut sink = self.sink.lock().clone();
            sink.subscribe(channel).await?;
            Ok(())
        }
        .boxed()
    }

    fn unsubscribe<'a>(&'a self, channel: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            self.ensure_open()?;
            let mut sink = self.sink.lock().clone();
            sink.unsubscribe(channel).await?;
            Ok(())
        }
        .boxed()
    }

    fn publish<'a>(
        &'a self,
        channel: &'a str,
        payload: String,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            self.ensure_open()?;
            let mut conn = self.publisher.clone();
            let receivers: usize = conn.publish(channel, payload).await?;
            tracing::debug!("[Realtime] Redis accepted publish on {} ({} receivers)", channel, receivers);
            Ok(())
        }
        .boxed()
    }

    fn reconnect(&self) -> BoxFuture<'_, Result<(), TransportError>> {
        async move {
            self.ensure_open()?;
            let running = self
                .forwarder
                .lock()
                .as_ref()
                .map_or(false, |forwarder| !forwarder.is_finished());
            if running {
                return Ok(());
            }

            let (sink, stream) = self.client.get_async_pubsub().await?.split();
            *self.sink.lock() = sink;
            let forwarder = spawn_forwarder(stream, self.events.clone());
            if let Some(stale) = self.forwarder.lock().replace(forwarder) {
                stale.abort();
            }

            tracing::info!("[Realtime] Reopened Redis pub/sub connection");
            Ok(())
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        async move {
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            if let Some(forwarder) = self.forwarder.lock().take() {
                forwarder.abort();
            }
            tracing::info!("[Realtime] Redis pub/sub connection released");
        }
        .boxed()
    }
}

/// Drain the pub/sub stream into the broker's inbound channel
fn spawn_forwarder(
    mut stream: PubSubStream,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            let channel = msg.get_channel_name().to_string();
            let payload = match msg.get_payload::<String>() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("[Realtime] Non-text payload on {}: {:?}", channel, e);
                    continue;
                }
            };
            if events.send(TransportEvent::Message { channel, payload }).is_err() {
                return;
            }
        }

        tracing::warn!("[Realtime] Redis pub/sub stream ended");
        let _ = events.send(TransportEvent::Disconnected {
            reason: "redis pub/sub connection closed".to_string(),
        });
    })
}
