/**
 * Server Initialization
 *
 * This module assembles the application state and the router.
 *
 * # Initialization Process
 *
 * 1. Open the feed store: PostgreSQL when `DATABASE_URL` is set and
 *    reachable, otherwise in memory
 * 2. Open the pub/sub transport: Redis when `REDIS_URL` is set and
 *    reachable, otherwise an in-process memory bus
 * 3. Start the live update broker on that transport
 * 4. Create the router
 *
 * A configured service that cannot be reached is logged and replaced by
 * its in-process counterpart.
 */

use std::sync::Arc;

use axum::Router;
use tokio::sync::mpsc;

use crate::backend::feed::{FeedStore, MemoryFeedStore, PgFeedStore};
use crate::backend::realtime::{LiveUpdateBroker, MemoryBus, RedisTransport, Transport, TransportEvent};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;
use crate::shared::LiveUpdate;

/// Build the application state from `config`
///
/// Must run inside a Tokio runtime; the broker spawns its tasks here.
pub async fn build_state(config: ServerConfig) -> AppState {
    tracing::info!("Initializing classboard backend server");

    let store = open_store(&config).await;
    let (transport, inbound) = open_transport(&config).await;
    let broker = LiveUpdateBroker::<LiveUpdate>::new(transport, inbound);

    AppState::new(store, broker, config)
}

/// Create and configure the Axum application
pub fn create_app(app_state: AppState) -> Router<()> {
    let app = create_router(app_state);
    tracing::info!("Router configured");
    app
}

async fn open_store(config: &ServerConfig) -> Arc<dyn FeedStore> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set. Using the in-memory feed store.");
        return Arc::new(MemoryFeedStore::new());
    };

    match load_database(url).await {
        Some(pool) => Arc::new(PgFeedStore::new(pool)),
        None => Arc::new(MemoryFeedStore::new()),
    }
}

async fn open_transport(
    config: &ServerConfig,
) -> (Arc<dyn Transport>, mpsc::UnboundedReceiver<TransportEvent>) {
    if let Some(url) = config.redis_url.as_deref() {
        match RedisTransport::connect(url).await {
            Ok((transport, inbound)) => return (Arc::new(transport), inbound),
            Err(e) => {
                tracing::error!("[Realtime] Failed to connect to Redis: {}", e);
                tracing::warn!("[Realtime] Live updates will not reach other server processes.");
            }
        }
    } else {
        tracing::warn!("REDIS_URL not set. Live updates stay within this process.");
    }

    let (transport, inbound) = MemoryBus::new().connect();
    (Arc::new(transport), inbound)
}
