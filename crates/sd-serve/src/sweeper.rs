use std::time::Duration;

use sd_core::RequestContext;
use sd_events::NotificationSource;

use crate::{middleware::idempotency, AppState};

/// Background sweep: expires stale candidates, drops settled ones past
/// retention, and prunes spent idempotency records.
pub async fn run(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;
        sweep_once(&state);
    }
}

fn sweep_once(state: &AppState) {
    let now = chrono::Utc::now();
    let ctx = RequestContext::new(NotificationSource::Sweep);
    match state.slated.candidates().expire_stale(&ctx, now) {
        Ok(expired) if !expired.is_empty() => {
            tracing::info!(count = expired.len(), "expired stale candidates");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "expire sweep failed"),
    }
    let purged = state.slated.candidates().purge_settled(now);
    if purged > 0 {
        tracing::debug!(count = purged, "purged settled candidates");
    }
    idempotency::prune_expired(&state.idempotency, now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_state;
    use chrono::{Duration as ChronoDuration, Utc};
    use sd_core::calendar::MemoryCalendar;
    use sd_core::config::{LifecycleConfig, SlotSearchConfig};
    use sd_core::extract::StubExtractor;
    use sd_core::types::candidate::CandidateDraft;
    use sd_core::types::enums::{CandidateState, Platform};
    use sd_events::NotificationBus;
    use std::sync::Arc;

    fn zero_ttl_state() -> AppState {
        build_state(
            NotificationBus::new(64),
            LifecycleConfig {
                ttl: ChronoDuration::zero(),
                retention: ChronoDuration::zero(),
            },
            SlotSearchConfig::default(),
            Arc::new(MemoryCalendar::new()),
            Arc::new(StubExtractor),
        )
    }

    #[tokio::test]
    async fn test_sweep_expires_and_purges() {
        let state = zero_ttl_state();
        let start = Utc::now() + ChronoDuration::hours(1);
        let draft = CandidateDraft {
            source_platform: Platform::Api,
            title: Some("review".to_string()),
            location: None,
            description: None,
            start_time: start,
            end_time: start + ChronoDuration::hours(1),
            confidence: 1.0,
        };
        let ctx = RequestContext::new(NotificationSource::Api);
        let event = state
            .slated
            .candidates()
            .create(&ctx, draft, None)
            .unwrap();

        sweep_once(&state);
        // Zero TTL: expired on the first pass, then zero retention
        // drops the settled record on the next.
        if let Some(found) = state.slated.candidates().get(&event.id) {
            assert_eq!(found.state, CandidateState::Expired);
        }
        sweep_once(&state);
        assert!(state.slated.candidates().get(&event.id).is_none());
    }
}
