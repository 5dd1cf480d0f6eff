use axum::http::StatusCode;
use axum::Json;
use sd_core::error::{CalendarError, CandidateError, ExtractError, SlatedError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
    pub correlation_id: Option<String>,
}

pub fn map_error(
    err: &SlatedError,
    correlation_id: Option<String>,
) -> (StatusCode, Json<ErrorEnvelope>) {
    let (status, code, message) = match err {
        SlatedError::Candidate(candidate) => map_candidate_error(candidate),
        SlatedError::Calendar(calendar) => map_calendar_error(calendar),
        SlatedError::Extract(extract) => map_extract_error(extract),
        SlatedError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            message.clone(),
        ),
    };

    (
        status,
        Json(ErrorEnvelope {
            code,
            message,
            correlation_id,
        }),
    )
}

fn map_candidate_error(err: &CandidateError) -> (StatusCode, &'static str, String) {
    match err {
        CandidateError::NotFound => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        CandidateError::InvalidTransition { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_state",
            err.to_string(),
        ),
        CandidateError::InvalidInput { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
    }
}

fn map_calendar_error(err: &CalendarError) -> (StatusCode, &'static str, String) {
    match err {
        CalendarError::Unavailable { .. } | CalendarError::WriteFailed { .. } => (
            StatusCode::BAD_GATEWAY,
            "downstream_failed",
            err.to_string(),
        ),
    }
}

fn map_extract_error(err: &ExtractError) -> (StatusCode, &'static str, String) {
    match err {
        ExtractError::Failed { .. } => (
            StatusCode::BAD_GATEWAY,
            "downstream_failed",
            err.to_string(),
        ),
    }
}
