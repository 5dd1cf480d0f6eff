use crate::types::enums::CandidateState;

/// Errors from candidate lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CandidateError {
    #[error("candidate not found")]
    NotFound,

    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: CandidateState,
        to: CandidateState,
    },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

/// Errors from the calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("calendar write failed: {reason}")]
    WriteFailed { reason: String },
}

/// Errors from the message extraction service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("extraction failed: {reason}")]
    Failed { reason: String },
}

/// Top-level error type returned by the facade and HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum SlatedError {
    #[error(transparent)]
    Candidate(#[from] CandidateError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SlatedError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
