pub mod middleware;
pub mod notify;
pub mod openapi;
pub mod pipeline;
pub mod routes;
pub mod sweeper;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Request;
use axum::Router;
use dashmap::DashMap;
use middleware::correlation::CorrelationId;
use middleware::idempotency::CachedResponse;
use sd_core::calendar::Calendar;
use sd_core::config::{LifecycleConfig, SlotSearchConfig};
use sd_core::extract::Extractor;
use sd_core::memory::MemoryStore;
use sd_core::reply::TraceReplySink;
use sd_core::Slated;
use sd_events::NotificationBus;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};

/// Shared idempotency bookkeeping: cached responses by key, plus a
/// notify handle per in-flight key so concurrent retries wait instead
/// of double-executing.
#[derive(Clone)]
pub struct IdempotencyState {
    pub records: Arc<DashMap<String, CachedResponse>>,
    pub locks: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
}

impl IdempotencyState {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for IdempotencyState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub slated: Arc<Slated<MemoryStore>>,
    pub calendar: Arc<dyn Calendar>,
    pub extractor: Arc<dyn Extractor>,
    pub notify: Arc<notify::NotifyState>,
    pub idempotency: IdempotencyState,
    pub search: SlotSearchConfig,
}

/// Wires the engine and its collaborators into the shared state the
/// router and background loops run on.
pub fn build_state(
    bus: NotificationBus,
    lifecycle: LifecycleConfig,
    search: SlotSearchConfig,
    calendar: Arc<dyn Calendar>,
    extractor: Arc<dyn Extractor>,
) -> AppState {
    let slated = Slated::new(MemoryStore::new(), bus, lifecycle)
        .with_reply_sink(Arc::new(TraceReplySink));
    AppState {
        slated: Arc::new(slated),
        calendar,
        extractor,
        notify: Arc::new(notify::NotifyState::new()),
        idempotency: IdempotencyState::new(),
        search,
    }
}

pub fn correlation_id_from_request<B>(request: &Request<B>) -> Option<String> {
    request
        .extensions()
        .get::<CorrelationId>()
        .map(|value| value.0.clone())
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app(state)).await
}
