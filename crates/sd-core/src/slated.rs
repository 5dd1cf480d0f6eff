use std::sync::Arc;

use chrono::{DateTime, Utc};
use sd_events::{NotificationBus, NotificationRecord, NotificationSource};

use crate::config::LifecycleConfig;
use crate::error::{CandidateError, SlatedError};
use crate::reply::ReplySink;
use crate::store::Store;
use crate::types::candidate::{CandidateDraft, CandidateEvent, DecisionOutcome};
use crate::types::conflict::ConflictResult;
use crate::types::enums::{CandidateState, Decision};
use crate::types::ids::CandidateId;
use crate::types::notification::NotificationBody;
use crate::validation::{validate_candidate_window, validate_state_transition};

/// Where a request came from, carried onto every notification it
/// produces.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub source: NotificationSource,
    pub correlation_id: Option<String>,
}

impl RequestContext {
    pub fn new(source: NotificationSource) -> Self {
        Self {
            source,
            correlation_id: None,
        }
    }

    pub fn with_correlation(
        source: NotificationSource,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            correlation_id: Some(correlation_id.into()),
        }
    }
}

/// The lifecycle engine: candidate state machine, notification
/// publishing, and chat reply fan-in behind one facade.
///
/// Every mutation runs under the store's per-candidate entry lock, so
/// racing callers serialize per id and a settled candidate can never
/// settle again. Notifications are published only for transitions that
/// actually happened, after the mutation committed.
pub struct Slated<S: Store> {
    store: S,
    bus: NotificationBus,
    config: LifecycleConfig,
    reply_sinks: Vec<Arc<dyn ReplySink>>,
}

impl<S: Store> Slated<S> {
    pub fn new(store: S, bus: NotificationBus, config: LifecycleConfig) -> Self {
        Self {
            store,
            bus,
            config,
            reply_sinks: Vec::new(),
        }
    }

    /// Registers a chat reply sink. Sinks receive every published
    /// notification from the same publish call, best-effort.
    pub fn with_reply_sink(mut self, sink: Arc<dyn ReplySink>) -> Self {
        self.reply_sinks.push(sink);
        self
    }

    pub fn candidates(&self) -> CandidatesApi<'_, S> {
        CandidatesApi { inner: self }
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    fn notify(
        &self,
        ctx: &RequestContext,
        bodies: Vec<NotificationBody>,
    ) -> Result<(), SlatedError> {
        for body in bodies {
            let value = serde_json::to_value(&body)
                .map_err(|err| SlatedError::internal(format!("serialize notification: {err}")))?;
            let record = NotificationRecord::new(ctx.correlation_id.clone(), ctx.source, value);
            self.bus.publish(record);
            for sink in &self.reply_sinks {
                sink.deliver(&body);
            }
        }
        Ok(())
    }
}

/// Candidate lifecycle operations.
pub struct CandidatesApi<'a, S: Store> {
    inner: &'a Slated<S>,
}

impl<'a, S: Store> CandidatesApi<'a, S> {
    /// Creates a candidate in `Pending`, assigning id, timestamps and
    /// the expiry deadline. The caller supplies the conflict
    /// annotation it computed (or `None` when the calendar could not
    /// be consulted).
    pub fn create(
        &self,
        ctx: &RequestContext,
        draft: CandidateDraft,
        conflict: Option<ConflictResult>,
    ) -> Result<CandidateEvent, SlatedError> {
        validate_candidate_window(&draft)?;

        let now = Utc::now();
        let event = CandidateEvent {
            id: CandidateId::generate(),
            source_platform: draft.source_platform,
            title: draft.title.unwrap_or_default(),
            location: draft.location,
            description: draft.description,
            start_time: draft.start_time,
            end_time: draft.end_time,
            confidence: draft.confidence.clamp(0.0, 1.0),
            state: CandidateState::Pending,
            conflict,
            created_at: now,
            expires_at: now + self.inner.config.ttl,
            settled_at: None,
            failure_reason: None,
        };
        self.inner.store.insert(event.clone())?;
        self.inner.notify(
            ctx,
            vec![NotificationBody::CandidatePending {
                event: event.clone(),
            }],
        )?;
        Ok(event)
    }

    /// Records that the user-facing notification went out. Repeating
    /// the mark is a no-op; marking a settled candidate is an error.
    pub fn mark_notified(
        &self,
        ctx: &RequestContext,
        id: &CandidateId,
    ) -> Result<CandidateEvent, SlatedError> {
        let (event, changed) = self.inner.store.update(id, |candidate| {
            if candidate.state == CandidateState::Notified {
                return Ok((candidate.clone(), false));
            }
            validate_state_transition(candidate.state, CandidateState::Notified)?;
            candidate.state = CandidateState::Notified;
            Ok((candidate.clone(), true))
        })?;

        if changed {
            self.inner.notify(
                ctx,
                vec![NotificationBody::CandidateNotified {
                    event: event.clone(),
                }],
            )?;
        }
        Ok(event)
    }

    /// Applies a human decision. The first decision wins: it settles
    /// the candidate and reports `caused_transition`. Any later
    /// decision, racing or retried, returns the settled candidate
    /// with `caused_transition` false and never errors.
    pub fn decide(
        &self,
        ctx: &RequestContext,
        id: &CandidateId,
        decision: Decision,
    ) -> Result<DecisionOutcome, SlatedError> {
        let now = Utc::now();
        let outcome = self.inner.store.update(id, |candidate| {
            if candidate.state.is_terminal() {
                return Ok(DecisionOutcome {
                    event: candidate.clone(),
                    caused_transition: false,
                });
            }
            let target = decision.target_state();
            validate_state_transition(candidate.state, target)?;
            candidate.state = target;
            candidate.settled_at = Some(now);
            Ok(DecisionOutcome {
                event: candidate.clone(),
                caused_transition: true,
            })
        })?;

        if outcome.caused_transition {
            self.inner
                .notify(ctx, vec![NotificationBody::for_event(outcome.event.clone())])?;
        }
        Ok(outcome)
    }

    /// Expires every candidate whose deadline has passed, returning
    /// the ones this sweep transitioned. Candidates settled between
    /// the snapshot and taking their entry lock are left alone.
    pub fn expire_stale(
        &self,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<Vec<CandidateEvent>, SlatedError> {
        let stale: Vec<CandidateId> = self
            .inner
            .store
            .all()
            .into_iter()
            .filter(|event| event.is_expired(now))
            .map(|event| event.id)
            .collect();

        let mut expired = Vec::new();
        for id in stale {
            let result = self.inner.store.update(&id, |candidate| {
                if candidate.is_expired(now) {
                    candidate.state = CandidateState::Expired;
                    candidate.settled_at = Some(now);
                    Ok(Some(candidate.clone()))
                } else {
                    Ok(None)
                }
            });
            match result {
                Ok(Some(event)) => expired.push(event),
                Ok(None) | Err(CandidateError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }

        let bodies = expired
            .iter()
            .cloned()
            .map(|event| NotificationBody::CandidateExpired { event })
            .collect();
        self.inner.notify(ctx, bodies)?;
        Ok(expired)
    }

    /// Marks a candidate failed after a downstream error. Idempotent
    /// on already-settled candidates, like `decide`.
    pub fn mark_failed(
        &self,
        ctx: &RequestContext,
        id: &CandidateId,
        reason: impl Into<String>,
    ) -> Result<CandidateEvent, SlatedError> {
        let reason = reason.into();
        let now = Utc::now();
        let (event, changed) = self.inner.store.update(id, |candidate| {
            if candidate.state.is_terminal() {
                return Ok((candidate.clone(), false));
            }
            validate_state_transition(candidate.state, CandidateState::Failed)?;
            candidate.state = CandidateState::Failed;
            candidate.failure_reason = Some(reason);
            candidate.settled_at = Some(now);
            Ok((candidate.clone(), true))
        })?;

        if changed {
            let reason = event.failure_reason.clone().unwrap_or_default();
            self.inner.notify(
                ctx,
                vec![NotificationBody::CandidateFailed {
                    event: event.clone(),
                    reason,
                }],
            )?;
        }
        Ok(event)
    }

    /// Drops settled candidates older than the retention window.
    /// Returns how many were removed. Purged ids then read as unknown.
    pub fn purge_settled(&self, now: DateTime<Utc>) -> usize {
        let retention = self.inner.config.retention;
        let purgeable: Vec<CandidateId> = self
            .inner
            .store
            .all()
            .into_iter()
            .filter(|event| {
                event.state.is_terminal()
                    && event.settled_at.is_some_and(|at| at + retention <= now)
            })
            .map(|event| event.id)
            .collect();

        let mut purged = 0;
        for id in &purgeable {
            if self.inner.store.remove(id).is_some() {
                purged += 1;
            }
        }
        purged
    }

    pub fn get(&self, id: &CandidateId) -> Option<CandidateEvent> {
        self.inner.store.get(id)
    }

    /// Candidates still awaiting a decision, oldest first.
    pub fn active(&self) -> Vec<CandidateEvent> {
        self.inner.store.active()
    }
}
