/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct serves as the central state container, holding:
 * - the feed store (PostgreSQL or in-memory)
 * - the live update broker
 * - the loaded configuration
 *
 * Every field is cheap to clone: the store and config sit behind `Arc`, the
 * broker is a shared handle.
 *
 * # State Extraction
 *
 * The `FromRef` implementations allow Axum handlers to extract specific
 * parts of the state without needing the entire `AppState`.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::feed::FeedStore;
use crate::backend::realtime::LiveUpdateBroker;
use crate::backend::server::config::ServerConfig;
use crate::shared::LiveUpdate;

/// Shared state of every request handler
#[derive(Clone)]
pub struct AppState {
    /// Source of feed items and sink for new posts/events
    pub store: Arc<dyn FeedStore>,

    /// Broker for `post-created` / `event-created:*` notifications
    pub broker: LiveUpdateBroker<LiveUpdate>,

    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn FeedStore>,
        broker: LiveUpdateBroker<LiveUpdate>,
        config: ServerConfig,
    ) -> Self {
        Self {
            store,
            broker,
            config: Arc::new(config),
        }
    }
}

/// Implement FromRef for the live update broker
///
/// Lets the SSE handlers take `State(LiveUpdateBroker<LiveUpdate>)`.
impl FromRef<AppState> for LiveUpdateBroker<LiveUpdate> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.broker.clone()
    }
}

impl FromRef<AppState> for Arc<dyn FeedStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
