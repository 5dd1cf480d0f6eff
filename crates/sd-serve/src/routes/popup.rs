use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use sd_core::types::candidate::CandidateEvent;
use sd_core::types::ids::CandidateId;
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

const UNAVAILABLE_MESSAGE: &str = "this request is no longer available";

/// What the approval popup renders: the candidate when it is still
/// decidable, otherwise a static explanation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopupView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<CandidateEvent>,
    pub actionable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/event-popup/{id}", get(event_popup))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/event-popup/{id}",
    params(("id" = String, Path, description = "Candidate ID")),
    responses((status = 200, body = PopupView), (status = 404, body = PopupView))
)]
pub(crate) async fn event_popup(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = CandidateId::new(id) else {
        return unavailable();
    };
    let Some(event) = state.slated.candidates().get(&id) else {
        return unavailable();
    };

    if event.state.is_terminal() {
        return Json(PopupView {
            event: Some(event),
            actionable: false,
            message: Some(UNAVAILABLE_MESSAGE.to_string()),
        })
        .into_response();
    }

    Json(PopupView {
        event: Some(event),
        actionable: true,
        message: None,
    })
    .into_response()
}

fn unavailable() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(PopupView {
            event: None,
            actionable: false,
            message: Some(UNAVAILABLE_MESSAGE.to_string()),
        }),
    )
        .into_response()
}
