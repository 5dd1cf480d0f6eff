use chrono::Duration;
use sd_core::conflict;
use sd_core::types::candidate::{CandidateDraft, CandidateEvent};
use sd_core::types::conflict::{ConflictResult, TimeSlot};
use sd_core::types::message::CanonicalMessage;
use sd_core::{RequestContext, SlatedError};

use crate::AppState;

/// Runs a normalized chat message through extraction and, when it
/// contains a scheduling intent, admits the resulting draft.
pub async fn process_message(
    state: &AppState,
    ctx: &RequestContext,
    message: CanonicalMessage,
) -> Result<Option<CandidateEvent>, SlatedError> {
    let Some(draft) = state.extractor.extract(&message).await? else {
        tracing::debug!(platform = ?message.platform, "no scheduling intent");
        return Ok(None);
    };
    let event = admit_candidate(state, ctx, draft).await?;
    Ok(Some(event))
}

/// Admits a draft: annotates it with the conflict check, creates the
/// candidate, and marks it notified once the pending record has gone
/// out to subscribers.
pub async fn admit_candidate(
    state: &AppState,
    ctx: &RequestContext,
    draft: CandidateDraft,
) -> Result<CandidateEvent, SlatedError> {
    let conflict = annotate_conflict(state, &draft).await;
    let event = state.slated.candidates().create(ctx, draft, conflict)?;
    let event = state.slated.candidates().mark_notified(ctx, &event.id)?;
    Ok(event)
}

/// Conflict annotation for a draft's window. A calendar outage
/// degrades to no annotation rather than blocking admission.
async fn annotate_conflict(state: &AppState, draft: &CandidateDraft) -> Option<ConflictResult> {
    let window = TimeSlot::new(draft.start_time, draft.end_time);
    if window.duration() <= Duration::zero() {
        return None;
    }
    // Wide enough that every slot the search could propose is checked
    // against known busy intervals.
    let lookout = TimeSlot::new(
        window.start,
        window.start + Duration::days(state.search.horizon_days) + window.duration(),
    );
    match state.calendar.list_events(&lookout).await {
        Ok(existing) => Some(conflict::check(&window, &existing, &state.search)),
        Err(err) => {
            tracing::warn!(error = %err, "calendar lookup failed; admitting unchecked");
            None
        }
    }
}
