use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ExtractError;
use crate::types::candidate::CandidateDraft;
use crate::types::message::CanonicalMessage;

/// The extraction service that turns chat messages into candidate
/// drafts. Runs out of process in production; the engine only sees
/// this interface.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// `Ok(None)` when the message contains no scheduling intent.
    async fn extract(&self, message: &CanonicalMessage)
        -> Result<Option<CandidateDraft>, ExtractError>;
}

/// Default extractor wiring. Only the pass-nothing stub exists today;
/// a real service client slots in here.
pub fn default_extractor() -> Arc<dyn Extractor> {
    Arc::new(StubExtractor)
}

/// Detects nothing. Keeps webhook ingestion running when no extraction
/// service is configured.
#[derive(Debug, Default)]
pub struct StubExtractor;

#[async_trait]
impl Extractor for StubExtractor {
    async fn extract(
        &self,
        _message: &CanonicalMessage,
    ) -> Result<Option<CandidateDraft>, ExtractError> {
        Ok(None)
    }
}

/// Returns the same draft for every message, with the platform taken
/// from the message. Test double for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct FixedExtractor {
    pub draft: CandidateDraft,
}

#[async_trait]
impl Extractor for FixedExtractor {
    async fn extract(
        &self,
        message: &CanonicalMessage,
    ) -> Result<Option<CandidateDraft>, ExtractError> {
        let mut draft = self.draft.clone();
        draft.source_platform = message.platform;
        Ok(Some(draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::enums::Platform;
    use chrono::{TimeZone, Utc};

    fn message(platform: Platform) -> CanonicalMessage {
        CanonicalMessage {
            platform,
            sender: "umi".to_string(),
            channel: "general".to_string(),
            text: "meeting tomorrow at 3pm?".to_string(),
            received_at: Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap(),
            message_ref: None,
        }
    }

    #[tokio::test]
    async fn test_stub_detects_nothing() {
        let extractor = StubExtractor;
        let result = extractor.extract(&message(Platform::Slack)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fixed_extractor_tags_platform() {
        let start = Utc.with_ymd_and_hms(2025, 6, 3, 15, 0, 0).unwrap();
        let extractor = FixedExtractor {
            draft: CandidateDraft {
                source_platform: Platform::Api,
                title: Some("meeting".to_string()),
                location: None,
                description: None,
                start_time: start,
                end_time: start + chrono::Duration::hours(1),
                confidence: 0.7,
            },
        };

        let draft = extractor
            .extract(&message(Platform::Discord))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(draft.source_platform, Platform::Discord);
        assert_eq!(draft.title.as_deref(), Some("meeting"));
    }
}
