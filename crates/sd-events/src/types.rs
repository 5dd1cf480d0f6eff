use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;
use utoipa::ToSchema;

/// One fanout record. `seq` is assigned by the bus at publish time and is
/// strictly increasing for the lifetime of the process; subscribers use it
/// as their ack cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub seq: i64,
    pub at: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub source: NotificationSource,
    pub body: Value,
}

impl NotificationRecord {
    /// Unstamped record (`seq = 0` until published).
    pub fn new(
        correlation_id: Option<String>,
        source: NotificationSource,
        body: Value,
    ) -> Self {
        Self {
            id: format!("ntf_{}", Ulid::new()),
            seq: 0,
            at: Utc::now(),
            correlation_id,
            source,
            body,
        }
    }
}

/// Which surface caused the mutation behind a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub enum NotificationSource {
    Api,
    Slack,
    Line,
    Discord,
    Teams,
    Sweep,
}
