use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::candidate::CandidateEvent;
use crate::types::enums::CandidateState;

/// Body of a lifecycle notification. One record is published per
/// caused transition (and one for creation); duplicate decisions and
/// idempotent re-marks publish nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationBody {
    CandidatePending { event: CandidateEvent },
    CandidateNotified { event: CandidateEvent },
    CandidateApproved { event: CandidateEvent },
    CandidateDenied { event: CandidateEvent },
    CandidateExpired { event: CandidateEvent },
    CandidateFailed { event: CandidateEvent, reason: String },
}

impl NotificationBody {
    /// The candidate snapshot the record carries.
    pub fn candidate(&self) -> &CandidateEvent {
        match self {
            Self::CandidatePending { event }
            | Self::CandidateNotified { event }
            | Self::CandidateApproved { event }
            | Self::CandidateDenied { event }
            | Self::CandidateExpired { event }
            | Self::CandidateFailed { event, .. } => event,
        }
    }

    pub fn state(&self) -> CandidateState {
        self.candidate().state
    }

    /// Builds the body matching the state the event is currently in.
    pub fn for_event(event: CandidateEvent) -> Self {
        match event.state {
            CandidateState::Pending => Self::CandidatePending { event },
            CandidateState::Notified => Self::CandidateNotified { event },
            CandidateState::Approved => Self::CandidateApproved { event },
            CandidateState::Denied => Self::CandidateDenied { event },
            CandidateState::Expired => Self::CandidateExpired { event },
            CandidateState::Failed => {
                let reason = event
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());
                Self::CandidateFailed { event, reason }
            }
        }
    }
}
