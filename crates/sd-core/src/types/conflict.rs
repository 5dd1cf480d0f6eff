use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::ids::CalendarEventId;

/// A half-open interval `[start, end)` on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open intersection: two slots that merely touch at a
    /// boundary do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An existing calendar entry that candidate windows are checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BusyEvent {
    pub id: CalendarEventId,
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyEvent {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start, self.end)
    }
}

/// Outcome of checking a candidate window against the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResult {
    pub has_conflict: bool,
    pub conflicting_event_ids: Vec<CalendarEventId>,
    /// Alternative windows of the same duration, earliest first. May be
    /// shorter than the requested count, or empty, when the search
    /// horizon is exhausted.
    pub suggested_slots: Vec<TimeSlot>,
}

impl ConflictResult {
    pub fn clear() -> Self {
        Self {
            has_conflict: false,
            conflicting_event_ids: Vec::new(),
            suggested_slots: Vec::new(),
        }
    }
}
