use std::sync::Mutex;

use crate::types::notification::NotificationBody;

/// Receives every published lifecycle notification, for pushing chat
/// replies back to the platform a candidate came from. Delivery is
/// best-effort: a sink must swallow its own failures and must not
/// block.
pub trait ReplySink: Send + Sync {
    fn deliver(&self, body: &NotificationBody);
}

/// Logs deliveries instead of sending them anywhere. Stands in for
/// platform reply clients that are not configured.
#[derive(Debug, Default)]
pub struct TraceReplySink;

impl ReplySink for TraceReplySink {
    fn deliver(&self, body: &NotificationBody) {
        let event = body.candidate();
        tracing::info!(
            candidate = %event.id,
            state = ?event.state,
            platform = ?event.source_platform,
            "reply fan-in"
        );
    }
}

/// Collects deliveries for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingReplySink {
    delivered: Mutex<Vec<NotificationBody>>,
}

impl RecordingReplySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<NotificationBody> {
        self.delivered.lock().expect("delivery log poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.delivered.lock().expect("delivery log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReplySink for RecordingReplySink {
    fn deliver(&self, body: &NotificationBody) {
        self.delivered
            .lock()
            .expect("delivery log poisoned")
            .push(body.clone());
    }
}
