use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::enums::Platform;

/// A chat message normalized out of platform-specific webhook shape.
///
/// Webhook handlers translate their payloads into this form so the
/// extraction pipeline is platform-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMessage {
    pub platform: Platform,
    pub sender: String,
    pub channel: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
    /// Platform-native handle for replying in-thread (Slack `ts`, LINE
    /// reply token, message id elsewhere), when the platform gave one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_ref: Option<String>,
}
