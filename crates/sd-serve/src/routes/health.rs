use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthView {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

#[utoipa::path(get, path = "/api/health", responses((status = 200, body = HealthView)))]
pub(crate) async fn health() -> impl IntoResponse {
    Json(HealthView {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}
