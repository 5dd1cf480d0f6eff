use crate::error::CandidateError;
use crate::types::candidate::CandidateDraft;
use crate::types::enums::CandidateState;

/// Checks the fields a draft must get right before a candidate is
/// created from it.
pub fn validate_candidate_window(draft: &CandidateDraft) -> Result<(), CandidateError> {
    if draft.end_time <= draft.start_time {
        return Err(CandidateError::InvalidInput {
            message: "endTime must be after startTime".to_string(),
        });
    }
    Ok(())
}

/// The lifecycle transition table. A same-state "transition" is
/// accepted so repeated marks stay idempotent; leaving a terminal
/// state is never allowed.
pub fn validate_state_transition(
    from: CandidateState,
    to: CandidateState,
) -> Result<(), CandidateError> {
    use CandidateState::{Approved, Denied, Expired, Failed, Notified, Pending};

    match (from, to) {
        (f, t) if f == t => Ok(()),
        (Pending, Notified | Approved | Denied | Expired | Failed) => Ok(()),
        (Notified, Approved | Denied | Expired | Failed) => Ok(()),
        (from, to) => Err(CandidateError::InvalidTransition { from, to }),
    }
}
