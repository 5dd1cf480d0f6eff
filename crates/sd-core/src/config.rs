use chrono::{Duration, FixedOffset, Offset, Timelike, Utc};

use crate::types::conflict::TimeSlot;

/// How long candidates live and how long settled ones are retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Time from creation until an undecided candidate expires.
    pub ttl: Duration,
    /// Time a settled candidate stays queryable before being purged.
    pub retention: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(300),
            retention: Duration::seconds(3600),
        }
    }
}

/// Parameters of the alternate-slot search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSearchConfig {
    /// Granularity of the forward scan, in minutes.
    pub step_minutes: u32,
    /// Start of business hours, minutes from local midnight.
    pub business_start_min: u32,
    /// End of business hours, minutes from local midnight.
    pub business_end_min: u32,
    /// Maximum number of suggestions returned.
    pub max_suggestions: usize,
    /// How far forward the scan goes before giving up, in days.
    pub horizon_days: i64,
    /// Offset of the business-hours clock from UTC, in minutes.
    pub utc_offset_minutes: i32,
}

impl Default for SlotSearchConfig {
    fn default() -> Self {
        Self {
            step_minutes: 15,
            business_start_min: 9 * 60,
            business_end_min: 18 * 60,
            max_suggestions: 3,
            horizon_days: 14,
            utc_offset_minutes: 0,
        }
    }
}

impl SlotSearchConfig {
    fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// A slot qualifies when, on the local business clock, it starts no
    /// earlier than opening, ends no later than closing, and does not
    /// span midnight.
    pub fn within_business_hours(&self, slot: &TimeSlot) -> bool {
        let offset = self.local_offset();
        let start = slot.start.with_timezone(&offset);
        let end = slot.end.with_timezone(&offset);

        if start.date_naive() != end.date_naive() {
            return false;
        }
        let start_min = start.hour() * 60 + start.minute();
        let end_min = end.hour() * 60 + end.minute();
        start_min >= self.business_start_min && end_min <= self.business_end_min
    }
}

/// Parses `HH:MM` into minutes from midnight. Used for the
/// business-hours environment variables.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (h, m) = value.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("09:00"), Some(540));
        assert_eq!(parse_hhmm("18:30"), Some(1110));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("9"), None);
        assert_eq!(parse_hhmm("aa:bb"), None);
    }

    #[test]
    fn test_business_hours_utc() {
        let config = SlotSearchConfig::default();
        let slot = |sh: u32, sm: u32, eh: u32, em: u32| {
            TimeSlot::new(
                Utc.with_ymd_and_hms(2025, 6, 2, sh, sm, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 6, 2, eh, em, 0).unwrap(),
            )
        };

        assert!(config.within_business_hours(&slot(9, 0, 10, 0)));
        assert!(config.within_business_hours(&slot(17, 0, 18, 0)));
        assert!(!config.within_business_hours(&slot(8, 30, 9, 30)));
        assert!(!config.within_business_hours(&slot(17, 30, 18, 30)));
    }

    #[test]
    fn test_business_hours_respect_offset() {
        let config = SlotSearchConfig {
            utc_offset_minutes: 540, // UTC+9
            ..SlotSearchConfig::default()
        };
        // 01:00Z is 10:00 local.
        let slot = TimeSlot::new(
            Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 2, 2, 0, 0).unwrap(),
        );
        assert!(config.within_business_hours(&slot));

        // 10:00Z is 19:00 local, after closing.
        let late = TimeSlot::new(
            Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 2, 11, 0, 0).unwrap(),
        );
        assert!(!config.within_business_hours(&late));
    }

    #[test]
    fn test_slot_spanning_midnight_rejected() {
        let config = SlotSearchConfig {
            business_start_min: 0,
            business_end_min: 24 * 60 - 1,
            ..SlotSearchConfig::default()
        };
        let slot = TimeSlot::new(
            Utc.with_ymd_and_hms(2025, 6, 2, 23, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 3, 0, 30, 0).unwrap(),
        );
        assert!(!config.within_business_hours(&slot));
    }

    #[test]
    fn test_lifecycle_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.ttl, Duration::seconds(300));
        assert_eq!(config.retention, Duration::seconds(3600));
    }
}
