use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ulid::Ulid;

use crate::error::CalendarError;
use crate::types::candidate::CandidateEvent;
use crate::types::conflict::{BusyEvent, TimeSlot};
use crate::types::ids::CalendarEventId;

/// The calendar provider the engine reads busy intervals from and
/// writes approved candidates to.
#[async_trait]
pub trait Calendar: Send + Sync {
    /// Entries overlapping `window`.
    async fn list_events(&self, window: &TimeSlot) -> Result<Vec<BusyEvent>, CalendarError>;

    /// Writes an approved candidate, returning the provider's id for
    /// the new entry.
    async fn write_event(&self, event: &CandidateEvent) -> Result<CalendarEventId, CalendarError>;
}

/// Selects a calendar implementation from `SLATED_CALENDAR_MODE`:
/// `memory` keeps entries in process, `disabled` fails every call, and
/// anything else is the accept-everything stub.
pub fn calendar_from_env() -> Arc<dyn Calendar> {
    match std::env::var("SLATED_CALENDAR_MODE").as_deref() {
        Ok("memory") => Arc::new(MemoryCalendar::new()),
        Ok("disabled") => Arc::new(StubCalendar::disabled()),
        _ => Arc::new(StubCalendar::new()),
    }
}

/// Placeholder provider used until a real calendar integration is
/// configured. The default mode reports an empty calendar and accepts
/// writes; `disabled` refuses everything.
#[derive(Debug, Default)]
pub struct StubCalendar {
    disabled: bool,
}

impl StubCalendar {
    pub fn new() -> Self {
        Self { disabled: false }
    }

    pub fn disabled() -> Self {
        Self { disabled: true }
    }
}

#[async_trait]
impl Calendar for StubCalendar {
    async fn list_events(&self, _window: &TimeSlot) -> Result<Vec<BusyEvent>, CalendarError> {
        if self.disabled {
            return Err(CalendarError::Unavailable {
                reason: "calendar integration disabled".to_string(),
            });
        }
        Ok(Vec::new())
    }

    async fn write_event(&self, _event: &CandidateEvent) -> Result<CalendarEventId, CalendarError> {
        if self.disabled {
            return Err(CalendarError::WriteFailed {
                reason: "calendar integration disabled".to_string(),
            });
        }
        Ok(CalendarEventId::new(format!("stub_{}", Ulid::new())))
    }
}

/// In-process calendar holding a mutable busy list and recording every
/// write. Used by the `memory` mode and throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryCalendar {
    busy: Mutex<Vec<BusyEvent>>,
    written: Mutex<Vec<CandidateEvent>>,
    fail_writes_remaining: AtomicUsize,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_busy(&self, event: BusyEvent) {
        self.busy.lock().expect("busy list poisoned").push(event);
    }

    /// Makes the next `n` writes fail, for exercising retry paths.
    pub fn fail_next_writes(&self, n: usize) {
        self.fail_writes_remaining.store(n, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.written.lock().expect("write log poisoned").len()
    }

    pub fn written(&self) -> Vec<CandidateEvent> {
        self.written.lock().expect("write log poisoned").clone()
    }
}

#[async_trait]
impl Calendar for MemoryCalendar {
    async fn list_events(&self, window: &TimeSlot) -> Result<Vec<BusyEvent>, CalendarError> {
        let busy = self.busy.lock().expect("busy list poisoned");
        Ok(busy
            .iter()
            .filter(|event| event.slot().overlaps(window))
            .cloned()
            .collect())
    }

    async fn write_event(&self, event: &CandidateEvent) -> Result<CalendarEventId, CalendarError> {
        let remaining = self.fail_writes_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_writes_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(CalendarError::WriteFailed {
                reason: "injected write failure".to_string(),
            });
        }

        let id = CalendarEventId::new(format!("cal_{}", Ulid::new()));
        let mut written = self.written.lock().expect("write log poisoned");
        written.push(event.clone());
        let mut busy = self.busy.lock().expect("busy list poisoned");
        busy.push(BusyEvent {
            id: id.clone(),
            title: Some(event.title.clone()),
            start: event.start_time,
            end: event.end_time,
        });
        Ok(id)
    }
}

/// Calls `write_event` up to `attempts` times, returning the first
/// success or the last error.
pub async fn write_with_retry(
    calendar: &dyn Calendar,
    event: &CandidateEvent,
    attempts: u32,
) -> Result<CalendarEventId, CalendarError> {
    let mut last = CalendarError::WriteFailed {
        reason: "no write attempted".to_string(),
    };
    for attempt in 1..=attempts.max(1) {
        match calendar.write_event(event).await {
            Ok(id) => return Ok(id),
            Err(err) => {
                tracing::warn!(
                    candidate = %event.id,
                    attempt,
                    error = %err,
                    "calendar write failed"
                );
                last = err;
            }
        }
    }
    Err(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::enums::{CandidateState, Platform};
    use crate::types::ids::CandidateId;
    use chrono::{TimeZone, Utc};

    fn approved_candidate() -> CandidateEvent {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        CandidateEvent {
            id: CandidateId::generate(),
            source_platform: Platform::Slack,
            title: "design review".to_string(),
            location: None,
            description: None,
            start_time: now + chrono::Duration::hours(1),
            end_time: now + chrono::Duration::hours(2),
            confidence: 0.9,
            state: CandidateState::Approved,
            conflict: None,
            created_at: now,
            expires_at: now + chrono::Duration::minutes(5),
            settled_at: Some(now),
            failure_reason: None,
        }
    }

    #[tokio::test]
    async fn test_memory_calendar_lists_only_overlapping() {
        let calendar = MemoryCalendar::new();
        let base = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        calendar.add_busy(BusyEvent {
            id: CalendarEventId::new("a"),
            title: None,
            start: base,
            end: base + chrono::Duration::hours(1),
        });
        calendar.add_busy(BusyEvent {
            id: CalendarEventId::new("b"),
            title: None,
            start: base + chrono::Duration::hours(3),
            end: base + chrono::Duration::hours(4),
        });

        let window = TimeSlot::new(
            base + chrono::Duration::minutes(30),
            base + chrono::Duration::hours(2),
        );
        let events = calendar.list_events(&window).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, CalendarEventId::new("a"));
    }

    #[tokio::test]
    async fn test_memory_calendar_write_becomes_busy() {
        let calendar = MemoryCalendar::new();
        let candidate = approved_candidate();

        calendar.write_event(&candidate).await.unwrap();
        assert_eq!(calendar.write_count(), 1);

        let events = calendar.list_events(&candidate.window()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title.as_deref(), Some("design review"));
    }

    #[tokio::test]
    async fn test_write_with_retry_recovers() {
        let calendar = MemoryCalendar::new();
        calendar.fail_next_writes(2);
        let candidate = approved_candidate();

        let id = write_with_retry(&calendar, &candidate, 3).await.unwrap();
        assert!(id.as_str().starts_with("cal_"));
        assert_eq!(calendar.write_count(), 1);
    }

    #[tokio::test]
    async fn test_write_with_retry_gives_up() {
        let calendar = MemoryCalendar::new();
        calendar.fail_next_writes(5);
        let candidate = approved_candidate();

        let err = write_with_retry(&calendar, &candidate, 3).await.unwrap_err();
        assert!(matches!(err, CalendarError::WriteFailed { .. }));
        assert_eq!(calendar.write_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_stub_refuses() {
        let calendar = StubCalendar::disabled();
        let window = TimeSlot::new(
            Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
        );
        assert!(calendar.list_events(&window).await.is_err());
        assert!(calendar.write_event(&approved_candidate()).await.is_err());
    }
}
