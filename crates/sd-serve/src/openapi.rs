use utoipa::OpenApi;

use crate::routes::health::HealthView;
use crate::routes::popup::PopupView;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use sd_core::types::candidate::{CandidateDraft, CandidateEvent, DecisionOutcome};
use sd_core::types::conflict::{BusyEvent, ConflictResult, TimeSlot};
use sd_core::types::enums::{CandidateState, Decision, Platform};
use sd_core::types::ids::{CalendarEventId, CandidateId, ChannelId};
use sd_core::types::message::CanonicalMessage;
use sd_core::types::notification::NotificationBody;
use sd_events::{NotificationRecord, NotificationSource};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::events::create_event,
        crate::routes::events::list_events,
        crate::routes::events::get_event,
        crate::routes::events::approve_event,
        crate::routes::events::deny_event,
        crate::routes::health::health,
        crate::routes::popup::event_popup
    ),
    components(schemas(
        CandidateEvent,
        CandidateDraft,
        DecisionOutcome,
        ConflictResult,
        TimeSlot,
        BusyEvent,
        CanonicalMessage,
        NotificationBody,
        NotificationRecord,
        CandidateId,
        ChannelId,
        CalendarEventId,
        CandidateState,
        Platform,
        Decision,
        NotificationSource,
        HealthView,
        PopupView
    ))
)]
struct ApiDoc;

pub fn generate_spec() -> String {
    ApiDoc::openapi()
        .to_json()
        .unwrap_or_else(|_| "{}".to_string())
}

pub fn ensure_initialized() {
    let _ = ApiDoc::openapi();
}

pub fn router() -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn swagger_ui() -> impl IntoResponse {
    let html = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Slated API Docs</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
      window.ui = SwaggerUIBundle({ url: '/api/openapi.json', dom_id: '#swagger-ui' });
    </script>
  </body>
</html>
"#;
    (axum::http::StatusCode::OK, axum::response::Html(html))
}
