use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use sd_core::calendar::write_with_retry;
use sd_core::error::CandidateError;
use sd_core::types::candidate::{CandidateDraft, CandidateEvent, DecisionOutcome};
use sd_core::types::enums::{CandidateState, Decision};
use sd_core::types::ids::CandidateId;
use sd_core::{RequestContext, SlatedError};
use sd_events::NotificationSource;

use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{pipeline, AppState};

const WRITE_ATTEMPTS: u32 = 3;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/event/{id}", get(get_event))
        .route("/event/{id}/approve", post(approve_event))
        .route("/event/{id}/deny", post(deny_event))
        .with_state(state)
}

fn parse_id(value: &str, correlation_id: Option<String>) -> Result<CandidateId, Response> {
    CandidateId::new(value.to_string()).map_err(|err| {
        map_error(
            &SlatedError::Candidate(CandidateError::InvalidInput {
                message: err.to_string(),
            }),
            correlation_id,
        )
        .into_response()
    })
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = CandidateDraft,
    responses((status = 200, body = CandidateEvent))
)]
pub(crate) async fn create_event(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(draft): Json<CandidateDraft>,
) -> Response {
    let ctx = RequestContext::with_correlation(NotificationSource::Api, correlation.0);
    match pipeline::admit_candidate(&state, &ctx, draft).await {
        Ok(event) => Json(event).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "candidate admission rejected");
            map_error(&err, ctx.correlation_id).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/events",
    responses((status = 200, body = Vec<CandidateEvent>))
)]
pub(crate) async fn list_events(State(state): State<AppState>) -> Response {
    Json(state.slated.candidates().active()).into_response()
}

#[utoipa::path(
    get,
    path = "/api/event/{id}",
    params(("id" = String, Path, description = "Candidate ID")),
    responses((status = 200, body = CandidateEvent), (status = 404))
)]
pub(crate) async fn get_event(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id, Some(correlation.0.clone())) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.slated.candidates().get(&id) {
        Some(event) => Json(event).into_response(),
        None => map_error(
            &SlatedError::Candidate(CandidateError::NotFound),
            Some(correlation.0),
        )
        .into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/event/{id}/approve",
    params(("id" = String, Path, description = "Candidate ID")),
    responses((status = 200, body = DecisionOutcome), (status = 404), (status = 502))
)]
pub(crate) async fn approve_event(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
) -> Response {
    settle(state, correlation, &id, Decision::Approve).await
}

#[utoipa::path(
    post,
    path = "/api/event/{id}/deny",
    params(("id" = String, Path, description = "Candidate ID")),
    responses((status = 200, body = DecisionOutcome), (status = 404))
)]
pub(crate) async fn deny_event(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
) -> Response {
    settle(state, correlation, &id, Decision::Deny).await
}

/// Applies a decision and, when this call approved the candidate,
/// finalizes it against the calendar. Duplicate decisions skip
/// finalization, so at most one write happens per candidate.
async fn settle(
    state: AppState,
    correlation: CorrelationId,
    id: &str,
    decision: Decision,
) -> Response {
    let ctx = RequestContext::with_correlation(NotificationSource::Api, correlation.0);
    let id = match parse_id(id, ctx.correlation_id.clone()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let outcome = match state.slated.candidates().decide(&ctx, &id, decision) {
        Ok(outcome) => outcome,
        Err(err) => return map_error(&err, ctx.correlation_id).into_response(),
    };

    if !(outcome.caused_transition && outcome.event.state == CandidateState::Approved) {
        return Json(outcome).into_response();
    }

    match write_with_retry(state.calendar.as_ref(), &outcome.event, WRITE_ATTEMPTS).await {
        Ok(calendar_id) => {
            tracing::info!(
                candidate = %outcome.event.id,
                entry = %calendar_id,
                "calendar write complete"
            );
            Json(outcome).into_response()
        }
        Err(write_err) => {
            if let Err(err) =
                state
                    .slated
                    .candidates()
                    .mark_failed(&ctx, &id, write_err.to_string())
            {
                return map_error(&err, ctx.correlation_id).into_response();
            }
            map_error(&SlatedError::Calendar(write_err), ctx.correlation_id).into_response()
        }
    }
}
