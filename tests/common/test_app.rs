//! In-memory application harness
//!
//! Builds the real router over a `MemoryFeedStore` and a broker on a
//! `MemoryBus`, then drives it with `tower::ServiceExt::oneshot`. Two
//! harnesses on the same bus behave like two server processes sharing one
//! pub/sub server.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, BodyDataStream};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use classboard::backend::feed::MemoryFeedStore;
use classboard::backend::middleware::PRINCIPAL_HEADER;
use classboard::backend::realtime::{LiveUpdateBroker, MemoryBus, Transport, TransportEvent};
use classboard::backend::server::{create_app, AppState, ServerConfig};
use classboard::shared::LiveUpdate;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// One server process under test
pub struct TestApp {
    pub store: Arc<MemoryFeedStore>,
    pub bus: MemoryBus,
    pub broker: LiveUpdateBroker<LiveUpdate>,
    router: Router,
}

impl TestApp {
    /// A process with its own store and bus
    pub fn new() -> Self {
        Self::on_bus(MemoryBus::new(), Arc::new(MemoryFeedStore::new()))
    }

    /// A process connected to an existing bus and store
    pub fn on_bus(bus: MemoryBus, store: Arc<MemoryFeedStore>) -> Self {
        Self::with_config(bus, store, ServerConfig::default())
    }

    pub fn with_config(bus: MemoryBus, store: Arc<MemoryFeedStore>, config: ServerConfig) -> Self {
        let (transport, inbound) = bus.connect();
        Self::assemble(bus, Arc::new(transport), inbound, store, config)
    }

    /// A process whose broker runs on a custom transport
    ///
    /// `bus` is left unconnected.
    pub fn on_transport(
        transport: Arc<dyn Transport>,
        inbound: mpsc::UnboundedReceiver<TransportEvent>,
        store: Arc<MemoryFeedStore>,
    ) -> Self {
        Self::assemble(MemoryBus::new(), transport, inbound, store, ServerConfig::default())
    }

    fn assemble(
        bus: MemoryBus,
        transport: Arc<dyn Transport>,
        inbound: mpsc::UnboundedReceiver<TransportEvent>,
        store: Arc<MemoryFeedStore>,
        config: ServerConfig,
    ) -> Self {
        let broker = LiveUpdateBroker::new(transport, inbound);
        let state = AppState::new(store.clone(), broker.clone(), config);

        Self {
            store,
            bus,
            broker,
            router: create_app(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// GET `uri`, returning status and JSON body (`Null` if not JSON)
    pub async fn get(&self, uri: &str, principal: Option<Uuid>) -> (StatusCode, Value) {
        let request = with_principal(Request::get(uri), principal)
            .body(Body::empty())
            .unwrap();
        into_json(self.send(request).await).await
    }

    /// POST a JSON body to `uri`
    pub async fn post_json(&self, uri: &str, principal: Option<Uuid>, body: Value) -> (StatusCode, Value) {
        let request = with_principal(Request::post(uri), principal)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        into_json(self.send(request).await).await
    }

    /// Open an SSE stream; the response body stays open until dropped
    pub async fn open_stream(&self, uri: &str, principal: Uuid) -> LiveStream {
        let request = with_principal(Request::get(uri), Some(principal))
            .body(Body::empty())
            .unwrap();
        let response = self.send(request).await;
        assert_eq!(response.status(), StatusCode::OK, "stream {} refused", uri);
        LiveStream {
            data: response.into_body().into_data_stream(),
        }
    }
}

/// Open SSE response body
pub struct LiveStream {
    data: BodyDataStream,
}

impl LiveStream {
    /// Next non keep-alive SSE frame, or `None` on timeout or end of stream
    pub async fn next_frame(&mut self, wait: Duration) -> Option<String> {
        let data = &mut self.data;
        tokio::time::timeout(wait, async move {
            while let Some(chunk) = data.next().await {
                let text = String::from_utf8_lossy(&chunk.ok()?).to_string();
                if text.trim_start().starts_with(':') {
                    continue;
                }
                return Some(text);
            }
            None
        })
        .await
        .ok()
        .flatten()
    }
}

fn with_principal(
    builder: axum::http::request::Builder,
    principal: Option<Uuid>,
) -> axum::http::request::Builder {
    match principal {
        Some(user_id) => builder.header(PRINCIPAL_HEADER, user_id.to_string()),
        None => builder,
    }
}

async fn into_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Let spawned broker tasks run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
