use std::collections::HashMap;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use sd_core::types::candidate::CandidateEvent;
use sd_core::types::enums::{CandidateState, Platform};
use sd_core::types::ids::ChannelId;
use sd_core::types::notification::NotificationBody;
use sd_events::{NotificationRecord, NotificationSource};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::AppState;

/// Bookkeeping for one connected notification channel.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub channel_id: ChannelId,
    pub connected_at: DateTime<Utc>,
    /// Highest `seq` the client acknowledged. Informational; delivery
    /// does not gate on it.
    pub last_acked_seq: i64,
}

/// Registry of connected channels. Publishes go through the broadcast
/// bus and never touch this map, so subscribing and unsubscribing
/// cannot block publishers.
pub struct NotifyState {
    channels: Mutex<HashMap<ChannelId, Subscription>>,
}

impl NotifyState {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    async fn register(&self, subscription: Subscription) {
        let mut channels = self.channels.lock().await;
        channels.insert(subscription.channel_id.clone(), subscription);
    }

    async fn record_ack(&self, channel_id: &ChannelId, seq: i64) {
        let mut channels = self.channels.lock().await;
        if let Some(subscription) = channels.get_mut(channel_id) {
            subscription.last_acked_seq = subscription.last_acked_seq.max(seq);
        }
    }

    async fn remove(&self, channel_id: &ChannelId) {
        let mut channels = self.channels.lock().await;
        channels.remove(channel_id);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.channels.lock().await.len()
    }

    pub async fn subscription(&self, channel_id: &ChannelId) -> Option<Subscription> {
        self.channels.lock().await.get(channel_id).cloned()
    }
}

impl Default for NotifyState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    #[serde(rename = "type")]
    kind: String,
    seq: Option<i64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/notifications/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(stream: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let channel_id = ChannelId::generate();
    // Subscribe before taking the snapshot: anything published in
    // between shows up in both, and staleness dedup drops the double.
    let bus_rx = state.slated.bus().subscribe();
    let snapshot = state.slated.candidates().active();

    state
        .notify
        .register(Subscription {
            channel_id: channel_id.clone(),
            connected_at: Utc::now(),
            last_acked_seq: 0,
        })
        .await;

    let _ = tx.send(text_message(
        serde_json::json!({ "type": "welcome", "channelId": channel_id.as_str() }).to_string(),
    ));
    let forward = tokio::spawn(forward_notifications(bus_rx, snapshot, tx.clone()));

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let parsed: Result<InboundMessage, _> = serde_json::from_str(&text);
        let Ok(message) = parsed else {
            let _ = tx.send(text_message(error_payload("invalid_message")));
            continue;
        };

        match message.kind.as_str() {
            "ack" => {
                if let Some(seq) = message.seq {
                    state.notify.record_ack(&channel_id, seq).await;
                }
            }
            "ping" => {
                let _ = tx.send(text_message(
                    serde_json::json!({ "type": "pong" }).to_string(),
                ));
            }
            _ => {
                let _ = tx.send(text_message(error_payload("unknown_type")));
            }
        }
    }

    forward.abort();
    state.notify.remove(&channel_id).await;
    tracing::debug!(channel = %channel_id, "notification channel closed");
}

/// Sends the resync snapshot, then follows the live feed. Per
/// candidate, a record older than what this connection already saw is
/// dropped, so a subscriber never observes a state moving backwards.
async fn forward_notifications(
    mut bus_rx: broadcast::Receiver<NotificationRecord>,
    snapshot: Vec<CandidateEvent>,
    tx: mpsc::UnboundedSender<Message>,
) {
    let mut seen: HashMap<String, u8> = HashMap::new();

    for event in snapshot {
        seen.insert(event.id.to_string(), event.state.rank());
        let Some(record) = resync_record(event) else {
            continue;
        };
        if tx.send(notification_message(&record)).is_err() {
            return;
        }
    }

    loop {
        match bus_rx.recv().await {
            Ok(record) => {
                if !should_forward(&mut seen, &record) {
                    continue;
                }
                if tx.send(notification_message(&record)).is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "notification channel lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn should_forward(seen: &mut HashMap<String, u8>, record: &NotificationRecord) -> bool {
    let Some((id, rank)) = record_rank(record) else {
        return true;
    };
    if seen.get(&id).is_some_and(|prev| *prev >= rank) {
        return false;
    }
    seen.insert(id, rank);
    true
}

fn record_rank(record: &NotificationRecord) -> Option<(String, u8)> {
    let id = record.body["payload"]["event"]["id"].as_str()?.to_string();
    let state: CandidateState =
        serde_json::from_value(record.body["payload"]["event"]["state"].clone()).ok()?;
    Some((id, state.rank()))
}

/// A snapshot record synthesized from current state for a freshly
/// connected channel. Carries `seq` 0; only live records get bus
/// sequence numbers.
fn resync_record(event: CandidateEvent) -> Option<NotificationRecord> {
    let source = source_for(event.source_platform);
    let body = NotificationBody::for_event(event);
    let value = serde_json::to_value(&body).ok()?;
    Some(NotificationRecord::new(None, source, value))
}

fn notification_message(record: &NotificationRecord) -> Message {
    text_message(
        serde_json::json!({
            "type": "notification",
            "seq": record.seq,
            "payload": payload_for(record)
        })
        .to_string(),
    )
}

/// Projects a record body onto the wire. Pending/Notified carry the
/// full candidate; terminals collapse to a compact result; anything
/// unrecognized is wrapped as-is.
fn payload_for(record: &NotificationRecord) -> Value {
    let event = &record.body["payload"]["event"];
    match serde_json::from_value::<CandidateState>(event["state"].clone()) {
        Ok(CandidateState::Pending | CandidateState::Notified) => {
            serde_json::json!({ "type": "event", "event": event })
        }
        Ok(state) => {
            let message = match state {
                CandidateState::Approved => "approved",
                CandidateState::Denied => "denied",
                CandidateState::Expired => "expired before a decision",
                _ => event["failureReason"].as_str().unwrap_or("downstream failure"),
            };
            serde_json::json!({
                "type": "result",
                "eventId": event["id"],
                "state": state,
                "success": matches!(state, CandidateState::Approved | CandidateState::Denied),
                "message": message
            })
        }
        Err(_) => serde_json::json!({ "type": "generic", "body": record.body }),
    }
}

fn source_for(platform: Platform) -> NotificationSource {
    match platform {
        Platform::Slack => NotificationSource::Slack,
        Platform::Line => NotificationSource::Line,
        Platform::Discord => NotificationSource::Discord,
        Platform::Teams => NotificationSource::Teams,
        Platform::Api => NotificationSource::Api,
    }
}

fn error_payload(code: &str) -> String {
    serde_json::json!({ "type": "error", "code": code }).to_string()
}

fn text_message(value: String) -> Message {
    Message::Text(Utf8Bytes::from(value))
}
