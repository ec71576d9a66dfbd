/**
 * Live Update Broker
 *
 * Channel based pub/sub on top of a [`Transport`]. Server-side code
 * registers callbacks on named channels; messages published anywhere on the
 * bus are decoded once per process and handed to every listener of the
 * channel.
 *
 * # Registry
 *
 * Two maps, guarded by one mutex:
 * - channel → listener ids, in registration order
 * - listener id → callback, channel, liveness flag
 *
 * The mutex is held only while the maps are read or changed. It is never
 * held across an `.await` or while a callback runs, so callbacks may
 * subscribe and unsubscribe freely.
 *
 * # Transport subscriptions
 *
 * The first listener of a channel subscribes the channel at the transport;
 * removing the last one unsubscribes it. These calls are queued (while the
 * registry lock is still held) to a single driver task, so the transport
 * sees them in the same order the registry changed. `subscribe` itself never
 * waits on the network: messages published before the transport subscribe
 * lands are not delivered.
 *
 * # Delivery
 *
 * A dispatch task reads the transport's inbound events. For each message
 * the payload is decoded once, the channel's listener ids are snapshotted,
 * and each listener is invoked in registration order if it is still
 * registered when its turn comes. A listener removed mid-dispatch (for
 * example by an earlier listener's callback) is skipped.
 *
 * Every listener carries a re-entrant gate that is held while its callback
 * runs. `unsubscribe` called outside any callback takes the gate after
 * removing the listener, so once it returns the callback is not running on
 * another thread and never runs again. `unsubscribe` called from inside a
 * callback does not wait: the listener still never starts again, but an
 * invocation already running elsewhere may finish. Waiting there could
 * deadlock two deliveries that cancel each other's listeners.
 *
 * # Connection state
 *
 * A failed transport subscribe flips the state to `Disconnected`.
 * `resubscribe_all` asks the transport to reconnect, re-subscribes every
 * channel with listeners and reports `Connected` only once all of that
 * succeeded.
 */
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::transport::{Transport, TransportError, TransportEvent};

/// Errors surfaced by the broker
#[derive(Debug, Error)]
pub enum BrokerError {
    /// `shutdown` has already run
    #[error("Live update broker is shut down")]
    Closed,

    /// Message could not be serialized for the transport
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Inbound payload could not be decoded
    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// Transport rejected the call
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Opaque listener identifier, never reused within a broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Health of the transport connection as seen by the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    /// Transport reported an outage; channels are not resubscribed
    Disconnected,
    /// `shutdown` released the transport
    Closed,
}

type Callback<M> = Arc<dyn Fn(&M) + Send + Sync>;

struct Listener<M> {
    channel: String,
    callback: Callback<M>,
    alive: Arc<AtomicBool>,
    gate: Arc<ReentrantMutex<()>>,
}

struct Registry<M> {
    channels: HashMap<String, Vec<ListenerId>>,
    listeners: HashMap<ListenerId, Listener<M>>,
    next_id: u64,
    closed: bool,
}

enum Command {
    Subscribe(String),
    Unsubscribe(String),
    Resubscribe(Vec<String>),
    Flush(oneshot::Sender<()>),
    Close(oneshot::Sender<()>),
}

struct Shared<M> {
    registry: Mutex<Registry<M>>,
    commands: mpsc::UnboundedSender<Command>,
    transport: Arc<dyn Transport>,
    connection: Arc<watch::Sender<ConnectionState>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

/// Removal hook a [`Subscription`] calls back into
trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: ListenerId);
}

/// Capability returned by [`LiveUpdateBroker::subscribe`]
///
/// Dropping a `Subscription` leaves the listener registered; call
/// [`cancel`](Self::cancel) or convert it with
/// [`into_guard`](Self::into_guard) to tie it to a scope.
pub struct Subscription {
    id: ListenerId,
    channel: String,
    alive: Arc<AtomicBool>,
    registry: Weak<dyn Unsubscribe>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether the listener can still be invoked
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Remove the listener; calling it again is a no-op
    pub fn cancel(&self) {
        match self.registry.upgrade() {
            Some(registry) => registry.unsubscribe(self.id),
            None => self.alive.store(false, Ordering::Release),
        }
    }

    /// Cancel the listener when the returned guard is dropped
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { subscription: self }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Subscription cancelled on drop, for listeners owned by a connection
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Subscription,
}

impl std::ops::Deref for SubscriptionGuard {
    type Target = Subscription;

    fn deref(&self) -> &Subscription {
        &self.subscription
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}

/// Pub/sub broker for messages of type `M`
///
/// Cheap to clone; clones share one registry and one transport connection.
pub struct LiveUpdateBroker<M> {
    shared: Arc<Shared<M>>,
}

impl<M> Clone for LiveUpdateBroker<M> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<M> LiveUpdateBroker<M>
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a broker over an open transport connection
    ///
    /// `inbound` is the event receiver the transport handed out when it
    /// connected. Spawns the driver and dispatch tasks, so this must be
    /// called from within a Tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        inbound: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (connection, _) = watch::channel(ConnectionState::Connected);
        let connection = Arc::new(connection);

        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry {
                channels: HashMap::new(),
                listeners: HashMap::new(),
                next_id: 0,
                closed: false,
            }),
            commands,
            transport: transport.clone(),
            connection: connection.clone(),
            dispatcher: Mutex::new(None),
        });

        tokio::spawn(drive_transport(transport, command_rx, connection));
        let dispatcher = tokio::spawn(dispatch_inbound(Arc::downgrade(&shared), inbound));
        *shared.dispatcher.lock() = Some(dispatcher);

        Self { shared }
    }

    /// Register `callback` on `channel`
    ///
    /// The first listener of a channel queues a transport subscribe; later
    /// ones share it. Returns as soon as the listener is registered locally.
    pub fn subscribe<F>(&self, channel: &str, callback: F) -> Result<Subscription, BrokerError>
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let alive = Arc::new(AtomicBool::new(true));
        let id = {
            let mut registry = self.shared.registry.lock();
            if registry.closed {
                return Err(BrokerError::Closed);
            }

            let id = ListenerId(registry.next_id);
            registry.next_id += 1;
            registry.listeners.insert(
                id,
                Listener {
                    channel: channel.to_string(),
                    callback: Arc::new(callback),
                    alive: alive.clone(),
                    gate: Arc::new(ReentrantMutex::new(())),
                },
            );

            let ids = registry.channels.entry(channel.to_string()).or_default();
            ids.push(id);
            if ids.len() == 1 {
                self.shared.send(Command::Subscribe(channel.to_string()));
            }
            id
        };

        tracing::debug!("[Realtime] {} subscribed to {}", id, channel);

        let registry: Weak<dyn Unsubscribe> = Arc::downgrade(&self.shared) as Weak<dyn Unsubscribe>;
        Ok(Subscription {
            id,
            channel: channel.to_string(),
            alive,
            registry,
        })
    }

    /// Remove a listener; unknown or already removed ids are ignored
    pub fn unsubscribe(&self, id: ListenerId) {
        self.shared.unsubscribe(id);
    }

    /// Publish `message` on `channel`, logging instead of failing
    ///
    /// Live updates are best effort: a down transport must not fail the
    /// write that triggered the publish.
    pub async fn publish(&self, channel: &str, message: &M) {
        if let Err(e) = self.try_publish(channel, message).await {
            tracing::warn!("[Realtime] Dropped publish on {}: {}", channel, e);
        }
    }

    /// Publish `message` on `channel`, returning any failure
    ///
    /// Resolves once the transport accepted the payload.
    pub async fn try_publish(&self, channel: &str, message: &M) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }
        let payload = serde_json::to_string(message).map_err(BrokerError::Encode)?;
        self.shared.transport.publish(channel, payload).await?;
        tracing::debug!("[Realtime] Published on {}", channel);
        Ok(())
    }

    /// Dispatch a raw inbound payload to the listeners of `channel`
    ///
    /// Called by the dispatch task for every transport message. Returns the
    /// number of callbacks invoked.
    pub fn deliver(&self, channel: &str, payload: &str) -> usize {
        self.shared.deliver(channel, payload)
    }

    /// Wait until every transport call queued so far has completed
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        self.shared.send(Command::Flush(ack));
        let _ = done.await;
    }

    /// Reconnect the transport and re-subscribe every channel with listeners
    ///
    /// Recovery hook for whoever supervises the transport after a
    /// `Disconnected` state. The work is queued to the driver task; the state
    /// returns to `Connected` only if every call succeeds. Returns the number
    /// of channels queued.
    pub fn resubscribe_all(&self) -> usize {
        let registry = self.shared.registry.lock();
        if registry.closed {
            return 0;
        }
        let channels: Vec<String> = registry.channels.keys().cloned().collect();
        let count = channels.len();
        self.shared.send(Command::Resubscribe(channels));

        tracing::info!("[Realtime] Resubscribing {} channels", count);
        count
    }

    /// Remove every listener, release all channels and the transport
    pub async fn shutdown(&self) {
        let closed = {
            let mut registry = self.shared.registry.lock();
            if registry.closed {
                return;
            }
            registry.closed = true;

            for listener in registry.listeners.values() {
                listener.alive.store(false, Ordering::Release);
            }
            registry.listeners.clear();

            let channels: Vec<String> = registry.channels.drain().map(|(channel, _)| channel).collect();
            tracing::info!("[Realtime] Shutting down, releasing {} channels", channels.len());
            for channel in channels {
                self.shared.send(Command::Unsubscribe(channel));
            }

            let (ack, closed) = oneshot::channel();
            self.shared.send(Command::Close(ack));
            closed
        };

        let _ = closed.await;
        if let Some(dispatcher) = self.shared.dispatcher.lock().take() {
            dispatcher.abort();
        }
        self.shared.connection.send_replace(ConnectionState::Closed);
        tracing::info!("[Realtime] Broker shut down");
    }

    /// Watch the transport connection state
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.registry.lock().closed
    }

    /// Number of live listeners on `channel`
    pub fn listener_count(&self, channel: &str) -> usize {
        self.shared
            .registry
            .lock()
            .channels
            .get(channel)
            .map_or(0, Vec::len)
    }

    /// Number of channels with at least one listener
    pub fn channel_count(&self) -> usize {
        self.shared.registry.lock().channels.len()
    }
}

impl<M> Shared<M> {
    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("[Realtime] Transport driver stopped, command dropped");
        }
    }
}

impl<M> Shared<M>
where
    M: DeserializeOwned,
{
    fn deliver(&self, channel: &str, payload: &str) -> usize {
        let message: M = match serde_json::from_str(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("[Realtime] Dropping message on {}: {}", channel, BrokerError::Decode(e));
                return 0;
            }
        };

        let ids = match self.registry.lock().channels.get(channel) {
            Some(ids) => ids.clone(),
            None => {
                tracing::debug!("[Realtime] No local listeners on {}", channel);
                return 0;
            }
        };

        let mut invoked = 0;
        for id in ids {
            let listener = self
                .registry
                .lock()
                .listeners
                .get(&id)
                .map(|l| (l.callback.clone(), l.alive.clone(), l.gate.clone()));

            let Some((callback, alive, gate)) = listener else {
                tracing::trace!("[Realtime] {} removed before dispatch, skipping", id);
                continue;
            };

            let _running = gate.lock();
            if !alive.load(Ordering::Acquire) {
                continue;
            }
            let _inside = CallbackScope::enter();
            callback(&message);
            invoked += 1;
        }
        invoked
    }
}

impl<M: Send + Sync> Unsubscribe for Shared<M> {
    fn unsubscribe(&self, id: ListenerId) {
        let gate = {
            let mut registry = self.registry.lock();
            let Some(listener) = registry.listeners.remove(&id) else {
                tracing::trace!("[Realtime] Unsubscribe of unknown {}", id);
                return;
            };
            listener.alive.store(false, Ordering::Release);

            let emptied = match registry.channels.get_mut(&listener.channel) {
                Some(ids) => {
                    ids.retain(|other| *other != id);
                    ids.is_empty()
                }
                None => false,
            };
            if emptied {
                registry.channels.remove(&listener.channel);
                self.send(Command::Unsubscribe(listener.channel.clone()));
            }

            tracing::debug!("[Realtime] {} unsubscribed from {}", id, listener.channel);
            listener.gate
        };

        // Wait out a callback still running on another thread, unless this
        // thread is itself running a callback.
        if !CallbackScope::active() {
            drop(gate.lock());
        }
    }
}

thread_local! {
    static CALLBACK_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running a listener callback
struct CallbackScope;

impl CallbackScope {
    fn enter() -> Self {
        CALLBACK_DEPTH.with(|depth| depth.set(depth.get() + 1));
        CallbackScope
    }

    fn active() -> bool {
        CALLBACK_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        CALLBACK_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Move to `state` unless the broker was already closed
fn set_state(connection: &watch::Sender<ConnectionState>, state: ConnectionState) {
    connection.send_if_modified(|current| {
        if *current == ConnectionState::Closed || *current == state {
            return false;
        }
        *current = state;
        true
    });
}

/// Execute transport subscribe/unsubscribe calls in queue order
async fn drive_transport(
    transport: Arc<dyn Transport>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    connection: Arc<watch::Sender<ConnectionState>>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Subscribe(channel) => {
                if let Err(e) = transport.subscribe(&channel).await {
                    tracing::warn!("[Realtime] Transport subscribe to {} failed: {}", channel, e);
                    set_state(&connection, ConnectionState::Disconnected);
                }
            }
            Command::Resubscribe(channels) => {
                let state = match resubscribe(transport.as_ref(), &channels).await {
                    Ok(()) => {
                        tracing::info!("[Realtime] Resubscribed {} channels", channels.len());
                        ConnectionState::Connected
                    }
                    Err(e) => {
                        tracing::warn!("[Realtime] Resubscribe failed: {}", e);
                        ConnectionState::Disconnected
                    }
                };
                set_state(&connection, state);
            }
            Command::Unsubscribe(channel) => {
                if let Err(e) = transport.unsubscribe(&channel).await {
                    tracing::warn!("[Realtime] Transport unsubscribe from {} failed: {}", channel, e);
                }
            }
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
            Command::Close(ack) => {
                transport.close().await;
                let _ = ack.send(());
                return;
            }
        }
    }
}

async fn resubscribe(transport: &dyn Transport, channels: &[String]) -> Result<(), TransportError> {
    transport.reconnect().await?;
    for channel in channels {
        transport.subscribe(channel).await?;
    }
    Ok(())
}

/// Route inbound transport events into the registry
async fn dispatch_inbound<M>(
    shared: Weak<Shared<M>>,
    mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
) where
    M: DeserializeOwned,
{
    while let Some(event) = inbound.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        match event {
            TransportEvent::Message { channel, payload } => {
                shared.deliver(&channel, &payload);
            }
            TransportEvent::Disconnected { reason } => {
                tracing::warn!("[Realtime] Transport disconnected: {}", reason);
                set_state(&shared.connection, ConnectionState::Disconnected);
            }
        }
    }
    tracing::info!("[Realtime] Transport event stream ended");
}
