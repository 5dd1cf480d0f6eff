use crate::types::NotificationRecord;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Process-wide fanout channel. Cloning shares the underlying channel and
/// the sequence counter.
#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<NotificationRecord>,
    next_seq: Arc<AtomicI64>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_seq: Arc::new(AtomicI64::new(1)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationRecord> {
        self.sender.subscribe()
    }

    /// Stamps the record with the next sequence number and broadcasts it.
    /// Returns the assigned sequence. A send error only means there are no
    /// live subscribers; the record still consumed a sequence number.
    pub fn publish(&self, mut record: NotificationRecord) -> i64 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        record.seq = seq;
        let _ = self.sender.send(record);
        seq
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationSource;

    fn record() -> NotificationRecord {
        NotificationRecord::new(
            Some("corr_test".to_string()),
            NotificationSource::Api,
            serde_json::json!({"type": "Probe"}),
        )
    }

    #[test]
    fn test_publish_stamps_increasing_seq() {
        let bus = NotificationBus::new(16);
        let mut rx = bus.subscribe();

        let first = bus.publish(record());
        let second = bus.publish(record());
        assert!(second > first);

        let got = rx.try_recv().unwrap();
        assert_eq!(got.seq, first);
        assert_eq!(got.source, NotificationSource::Api);
        let got = rx.try_recv().unwrap();
        assert_eq!(got.seq, second);
    }

    #[test]
    fn test_publish_without_subscribers_still_advances() {
        let bus = NotificationBus::new(16);
        let first = bus.publish(record());
        let second = bus.publish(record());
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_clones_share_sequence() {
        let bus = NotificationBus::new(16);
        let clone = bus.clone();
        let first = bus.publish(record());
        let second = clone.publish(record());
        assert_eq!(second, first + 1);
    }
}
