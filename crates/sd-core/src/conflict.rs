use chrono::Duration;

use crate::config::SlotSearchConfig;
use crate::types::conflict::{BusyEvent, ConflictResult, TimeSlot};

/// Checks a candidate window against existing calendar entries.
///
/// Pure and deterministic: the result depends only on the arguments.
/// Suggestions are searched only when a conflict exists.
pub fn check(
    window: &TimeSlot,
    existing: &[BusyEvent],
    config: &SlotSearchConfig,
) -> ConflictResult {
    let conflicting: Vec<_> = existing
        .iter()
        .filter(|busy| busy.slot().overlaps(window))
        .map(|busy| busy.id.clone())
        .collect();

    if conflicting.is_empty() {
        return ConflictResult::clear();
    }

    ConflictResult {
        has_conflict: true,
        conflicting_event_ids: conflicting,
        suggested_slots: find_open_slots(window, existing, config),
    }
}

/// Scans forward from the requested window in fixed steps for
/// conflict-free slots of the same duration, inside business hours,
/// until enough are found or the horizon is reached. Earliest first;
/// possibly fewer than requested, possibly none.
pub fn find_open_slots(
    window: &TimeSlot,
    existing: &[BusyEvent],
    config: &SlotSearchConfig,
) -> Vec<TimeSlot> {
    let duration = window.duration();
    if duration <= Duration::zero() || config.step_minutes == 0 {
        return Vec::new();
    }

    let step = Duration::minutes(i64::from(config.step_minutes));
    let horizon = window.start + Duration::days(config.horizon_days);
    let mut slots = Vec::new();
    let mut start = window.start + step;

    while start < horizon && slots.len() < config.max_suggestions {
        let slot = TimeSlot::new(start, start + duration);
        if config.within_business_hours(&slot)
            && existing.iter().all(|busy| !busy.slot().overlaps(&slot))
        {
            slots.push(slot);
        }
        start += step;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ids::CalendarEventId;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, min, 0).unwrap()
    }

    fn busy(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> BusyEvent {
        BusyEvent {
            id: CalendarEventId::new(id),
            title: None,
            start,
            end,
        }
    }

    #[test]
    fn test_clear_when_nothing_overlaps() {
        let window = TimeSlot::new(at(2, 10, 0), at(2, 11, 0));
        let existing = vec![
            busy("a", at(2, 9, 0), at(2, 10, 0)),
            busy("b", at(2, 11, 0), at(2, 12, 0)),
        ];

        let result = check(&window, &existing, &SlotSearchConfig::default());
        assert!(!result.has_conflict);
        assert!(result.conflicting_event_ids.is_empty());
        assert!(result.suggested_slots.is_empty());
    }

    #[test]
    fn test_overlapping_meeting_shifts_first_suggestion_past_it() {
        // Requested 15:00-16:00 against an existing 15:30-16:30: the
        // first free same-length slot on a 15-minute grid is 16:30.
        let window = TimeSlot::new(at(2, 15, 0), at(2, 16, 0));
        let existing = vec![busy("busy-1", at(2, 15, 30), at(2, 16, 30))];

        let result = check(&window, &existing, &SlotSearchConfig::default());
        assert!(result.has_conflict);
        assert_eq!(
            result.conflicting_event_ids,
            vec![CalendarEventId::new("busy-1")]
        );
        assert_eq!(result.suggested_slots.len(), 3);
        assert_eq!(result.suggested_slots[0].start, at(2, 16, 30));
        assert_eq!(result.suggested_slots[0].end, at(2, 17, 30));
    }

    #[test]
    fn test_suggestions_never_overlap_existing() {
        let window = TimeSlot::new(at(2, 9, 0), at(2, 10, 0));
        let existing = vec![
            busy("a", at(2, 9, 30), at(2, 11, 0)),
            busy("b", at(2, 11, 30), at(2, 13, 0)),
            busy("c", at(2, 14, 0), at(2, 15, 0)),
        ];

        let result = check(&window, &existing, &SlotSearchConfig::default());
        assert!(result.has_conflict);
        assert!(!result.suggested_slots.is_empty());
        for slot in &result.suggested_slots {
            for event in &existing {
                assert!(!slot.overlaps(&event.slot()), "{slot:?} overlaps {event:?}");
            }
            assert_eq!(slot.duration(), window.duration());
        }
    }

    #[test]
    fn test_suggestions_sorted_and_capped() {
        let window = TimeSlot::new(at(2, 9, 0), at(2, 9, 30));
        let existing = vec![busy("a", at(2, 9, 0), at(2, 9, 30))];
        let config = SlotSearchConfig {
            max_suggestions: 2,
            ..SlotSearchConfig::default()
        };

        let slots = find_open_slots(&window, &existing, &config);
        assert_eq!(slots.len(), 2);
        assert!(slots[0].start < slots[1].start);
    }

    #[test]
    fn test_deterministic() {
        let window = TimeSlot::new(at(2, 15, 0), at(2, 16, 0));
        let existing = vec![busy("a", at(2, 15, 30), at(2, 16, 30))];
        let config = SlotSearchConfig::default();

        assert_eq!(
            check(&window, &existing, &config),
            check(&window, &existing, &config)
        );
    }

    #[test]
    fn test_suggestions_stay_inside_business_hours() {
        // Requested at the end of the day; the scan must roll over to
        // the next morning rather than suggest an evening slot.
        let window = TimeSlot::new(at(2, 17, 0), at(2, 18, 0));
        let existing = vec![busy("a", at(2, 17, 0), at(2, 18, 0))];

        let result = check(&window, &existing, &SlotSearchConfig::default());
        assert!(result.has_conflict);
        assert_eq!(result.suggested_slots[0].start, at(3, 9, 0));

        let config = SlotSearchConfig::default();
        for slot in &result.suggested_slots {
            assert!(config.within_business_hours(slot), "{slot:?}");
        }
    }

    #[test]
    fn test_exhausted_horizon_yields_empty() {
        let window = TimeSlot::new(at(2, 10, 0), at(2, 11, 0));
        // One block covering every possible slot within the horizon.
        let existing = vec![busy("wall", at(1, 0, 0), at(30, 0, 0))];
        let config = SlotSearchConfig {
            horizon_days: 14,
            ..SlotSearchConfig::default()
        };

        let result = check(&window, &existing, &config);
        assert!(result.has_conflict);
        assert!(result.suggested_slots.is_empty());
    }

    #[test]
    fn test_partial_results_allowed() {
        let window = TimeSlot::new(at(2, 10, 0), at(2, 11, 0));
        // Free only between 16:00 and 18:00 on the last day inside the
        // horizon; everything else is blocked.
        let existing = vec![
            busy("a", at(1, 0, 0), at(15, 16, 0)),
            busy("b", at(15, 18, 0), at(30, 0, 0)),
        ];
        let config = SlotSearchConfig {
            horizon_days: 14,
            ..SlotSearchConfig::default()
        };

        let slots = find_open_slots(&window, &existing, &config);
        assert!(!slots.is_empty());
        assert!(slots.len() <= config.max_suggestions);
        for slot in &slots {
            assert!(slot.start >= at(15, 16, 0));
            assert!(slot.end <= at(15, 18, 0));
        }
    }

    #[test]
    fn test_zero_duration_window_suggests_nothing() {
        let window = TimeSlot::new(at(2, 10, 0), at(2, 10, 0));
        let existing = vec![busy("a", at(2, 9, 0), at(2, 11, 0))];
        assert!(find_open_slots(&window, &existing, &SlotSearchConfig::default()).is_empty());
    }
}
