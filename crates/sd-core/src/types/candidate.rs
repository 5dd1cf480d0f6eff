use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::conflict::{ConflictResult, TimeSlot};
use crate::types::enums::{CandidateState, Platform};
use crate::types::ids::CandidateId;

/// A proposed calendar entry extracted from chat (or submitted
/// directly), tracked through the approval lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEvent {
    pub id: CandidateId,
    pub source_platform: Platform,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Extraction confidence in `[0, 1]`. Informational only; no
    /// lifecycle behavior branches on it.
    pub confidence: f64,
    pub state: CandidateState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictResult>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl CandidateEvent {
    pub fn window(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.end_time)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_terminal() && self.expires_at <= now
    }
}

fn default_platform() -> Platform {
    Platform::Api
}

fn default_confidence() -> f64 {
    1.0
}

/// Input for creating a candidate. Everything lifecycle-related (id,
/// state, timestamps) is assigned at creation, not supplied here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDraft {
    #[serde(default = "default_platform")]
    pub source_platform: Platform,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// What a decision call did: the candidate as stored afterwards, and
/// whether this particular call performed the transition. A duplicate
/// decision returns the settled candidate with `caused_transition`
/// false.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub event: CandidateEvent,
    pub caused_transition: bool,
}
