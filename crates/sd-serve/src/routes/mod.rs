pub mod error;
pub mod events;
pub mod health;
pub mod popup;
pub mod webhooks;

use crate::middleware::correlation::correlation_middleware;
use crate::middleware::idempotency::IdempotencyLayer;
use crate::{notify, openapi, AppState};
use axum::middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(events::router(state.clone()))
        .merge(webhooks::router(state.clone()))
        .merge(health::router())
        .merge(openapi::router())
        .merge(notify::router(state.clone()))
        .layer(IdempotencyLayer::new(state.clone()))
        .route_layer(middleware::from_fn(correlation_middleware));

    Router::new()
        .nest("/api", api)
        // The approval popup is a public page, not part of the API.
        .merge(popup::router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
