use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use chrono::Utc;
use sd_core::types::enums::Platform;
use sd_core::types::message::CanonicalMessage;
use sd_core::RequestContext;
use sd_events::NotificationSource;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::correlation::CorrelationId;
use crate::{pipeline, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook/slack", post(slack_webhook))
        .route("/webhook/line", post(line_webhook))
        .route("/webhook/discord", post(discord_webhook))
        .route("/webhook/teams", post(teams_webhook))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SlackEnvelope {
    #[serde(rename = "type")]
    kind: String,
    event: Option<SlackEvent>,
}

#[derive(Debug, Deserialize)]
struct SlackEvent {
    #[serde(rename = "type")]
    kind: String,
    user: Option<String>,
    channel: Option<String>,
    text: Option<String>,
    ts: Option<String>,
    bot_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineEnvelope {
    #[serde(default)]
    events: Vec<LineEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineEvent {
    #[serde(rename = "type")]
    kind: String,
    reply_token: Option<String>,
    source: Option<LineSource>,
    message: Option<LineMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineSource {
    user_id: Option<String>,
    group_id: Option<String>,
    room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineMessage {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscordMessage {
    author: Option<String>,
    content: Option<String>,
    channel_id: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamsActivity {
    from: Option<TeamsFrom>,
    text: Option<String>,
    conversation: Option<TeamsConversation>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamsFrom {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamsConversation {
    id: Option<String>,
}

/// Slack Events API. Answers the `url_verification` handshake inline;
/// everything else is acknowledged immediately and processed in the
/// background so Slack's delivery deadline is never at risk.
pub(crate) async fn slack_webhook(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(payload): Json<Value>,
) -> Response {
    if payload["type"] == "url_verification" {
        let challenge = payload["challenge"].as_str().unwrap_or_default();
        return Json(json!({ "challenge": challenge })).into_response();
    }

    if let Some(message) = canonical_from_slack(&payload) {
        spawn_pipeline(state, NotificationSource::Slack, correlation.0, message);
    }
    Json(json!({ "ok": true })).into_response()
}

pub(crate) async fn line_webhook(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(payload): Json<Value>,
) -> Response {
    for message in canonical_from_line(&payload) {
        spawn_pipeline(
            state.clone(),
            NotificationSource::Line,
            correlation.0.clone(),
            message,
        );
    }
    Json(json!({})).into_response()
}

pub(crate) async fn discord_webhook(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(payload): Json<Value>,
) -> Response {
    if let Some(message) = canonical_from_discord(&payload) {
        spawn_pipeline(state, NotificationSource::Discord, correlation.0, message);
    }
    Json(json!({ "ok": true })).into_response()
}

pub(crate) async fn teams_webhook(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(payload): Json<Value>,
) -> Response {
    if let Some(message) = canonical_from_teams(&payload) {
        spawn_pipeline(state, NotificationSource::Teams, correlation.0, message);
    }
    Json(json!({ "ok": true })).into_response()
}

fn spawn_pipeline(
    state: AppState,
    source: NotificationSource,
    correlation_id: String,
    message: CanonicalMessage,
) {
    tokio::spawn(async move {
        let ctx = RequestContext::with_correlation(source, correlation_id);
        if let Err(err) = pipeline::process_message(&state, &ctx, message).await {
            tracing::warn!(error = %err, ?source, "webhook pipeline failed");
        }
    });
}

fn canonical_from_slack(payload: &Value) -> Option<CanonicalMessage> {
    let envelope: SlackEnvelope = serde_json::from_value(payload.clone()).ok()?;
    if envelope.kind != "event_callback" {
        return None;
    }
    let event = envelope.event?;
    // Only user-authored messages; echoes from bots (including our own
    // replies) must not loop back through extraction.
    if event.kind != "message" || event.bot_id.is_some() {
        return None;
    }
    let text = event.text.filter(|text| !text.trim().is_empty())?;
    Some(CanonicalMessage {
        platform: Platform::Slack,
        sender: event.user.unwrap_or_else(|| "unknown".to_string()),
        channel: event.channel.unwrap_or_default(),
        text,
        received_at: Utc::now(),
        message_ref: event.ts,
    })
}

fn canonical_from_line(payload: &Value) -> Vec<CanonicalMessage> {
    let Ok(envelope) = serde_json::from_value::<LineEnvelope>(payload.clone()) else {
        return Vec::new();
    };
    envelope
        .events
        .into_iter()
        .filter_map(|event| {
            if event.kind != "message" {
                return None;
            }
            let message = event.message?;
            if message.kind != "text" {
                return None;
            }
            let text = message.text.filter(|text| !text.trim().is_empty())?;
            let source = event.source;
            let sender = source
                .as_ref()
                .and_then(|s| s.user_id.clone())
                .unwrap_or_else(|| "unknown".to_string());
            let channel = source
                .as_ref()
                .and_then(|s| s.group_id.clone().or_else(|| s.room_id.clone()))
                .unwrap_or_else(|| sender.clone());
            Some(CanonicalMessage {
                platform: Platform::Line,
                sender,
                channel,
                text,
                received_at: Utc::now(),
                message_ref: event.reply_token,
            })
        })
        .collect()
}

fn canonical_from_discord(payload: &Value) -> Option<CanonicalMessage> {
    let message: DiscordMessage = serde_json::from_value(payload.clone()).ok()?;
    let text = message.content.filter(|text| !text.trim().is_empty())?;
    Some(CanonicalMessage {
        platform: Platform::Discord,
        sender: message.author.unwrap_or_else(|| "unknown".to_string()),
        channel: message.channel_id.unwrap_or_default(),
        text,
        received_at: Utc::now(),
        message_ref: message.id,
    })
}

fn canonical_from_teams(payload: &Value) -> Option<CanonicalMessage> {
    let activity: TeamsActivity = serde_json::from_value(payload.clone()).ok()?;
    let text = activity.text.filter(|text| !text.trim().is_empty())?;
    Some(CanonicalMessage {
        platform: Platform::Teams,
        sender: activity
            .from
            .and_then(|from| from.name)
            .unwrap_or_else(|| "unknown".to_string()),
        channel: activity
            .conversation
            .and_then(|conversation| conversation.id)
            .unwrap_or_default(),
        text,
        received_at: Utc::now(),
        message_ref: activity.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_state;
    use sd_core::calendar::MemoryCalendar;
    use sd_core::config::{LifecycleConfig, SlotSearchConfig};
    use sd_core::extract::StubExtractor;
    use sd_events::NotificationBus;
    use std::sync::Arc;

    fn setup() -> AppState {
        build_state(
            NotificationBus::new(64),
            LifecycleConfig::default(),
            SlotSearchConfig::default(),
            Arc::new(MemoryCalendar::new()),
            Arc::new(StubExtractor),
        )
    }

    #[tokio::test]
    async fn test_slack_url_verification_echoes_challenge() {
        let state = setup();
        let response = slack_webhook(
            State(state),
            Extension(CorrelationId("corr_1".to_string())),
            Json(json!({ "type": "url_verification", "challenge": "c0ffee" })),
        )
        .await;

        assert_eq!(response.status(), 200);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["challenge"], "c0ffee");
    }

    #[test]
    fn test_slack_message_normalizes() {
        let payload = json!({
            "type": "event_callback",
            "event": {
                "type": "message",
                "user": "U123",
                "channel": "C456",
                "text": "meeting tomorrow 3pm",
                "ts": "1717320000.000100"
            }
        });

        let message = canonical_from_slack(&payload).unwrap();
        assert_eq!(message.platform, Platform::Slack);
        assert_eq!(message.sender, "U123");
        assert_eq!(message.channel, "C456");
        assert_eq!(message.message_ref.as_deref(), Some("1717320000.000100"));
    }

    #[test]
    fn test_slack_bot_echo_is_dropped() {
        let payload = json!({
            "type": "event_callback",
            "event": {
                "type": "message",
                "bot_id": "B1",
                "channel": "C456",
                "text": "candidate created"
            }
        });
        assert!(canonical_from_slack(&payload).is_none());
    }

    #[test]
    fn test_line_extracts_text_events_only() {
        let payload = json!({
            "events": [
                {
                    "type": "message",
                    "replyToken": "r1",
                    "source": { "userId": "u1", "groupId": "g1" },
                    "message": { "type": "text", "text": "lunch friday?" }
                },
                {
                    "type": "message",
                    "replyToken": "r2",
                    "source": { "userId": "u2" },
                    "message": { "type": "sticker" }
                },
                { "type": "follow" }
            ]
        });

        let messages = canonical_from_line(&payload);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel, "g1");
        assert_eq!(messages[0].message_ref.as_deref(), Some("r1"));
    }

    #[test]
    fn test_discord_and_teams_normalize() {
        let discord = canonical_from_discord(&json!({
            "author": "kai",
            "content": "standup at 9?",
            "channel_id": "555"
        }))
        .unwrap();
        assert_eq!(discord.platform, Platform::Discord);
        assert_eq!(discord.sender, "kai");

        let teams = canonical_from_teams(&json!({
            "from": { "name": "Rin" },
            "text": "review at 4pm",
            "conversation": { "id": "19:abc" }
        }))
        .unwrap();
        assert_eq!(teams.platform, Platform::Teams);
        assert_eq!(teams.channel, "19:abc");
    }

    #[test]
    fn test_empty_text_is_ignored() {
        assert!(canonical_from_discord(&json!({ "author": "a", "content": "  " })).is_none());
        assert!(canonical_from_teams(&json!({ "text": "" })).is_none());
    }
}
